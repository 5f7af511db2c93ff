//! Stacked LSTM regressor with dropout, two dense layers and Adam.
//!
//! Layout: `LSTM(1 -> units, sequences) -> Dropout -> LSTM(units -> units, last)
//! -> Dropout -> Dense(units -> dense_units) -> Dense(dense_units -> 1)`.
//! Gradients are computed by backpropagation through time over each window.

use forecast_spi::{DenseWeights, LstmWeights};
use rand::prelude::*;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn glorot_uniform(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> f64 {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    rng.gen_range(-limit..limit)
}

/// Hyperparameters of one training run
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrainingPlan {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub dropout: f64,
}

/// Losses observed while training
#[derive(Debug, Clone)]
pub(crate) struct TrainingHistory {
    /// Mean training loss per epoch
    pub losses: Vec<f64>,
    pub validation_loss: Option<f64>,
}

impl TrainingHistory {
    pub fn final_loss(&self) -> f64 {
        self.losses.last().copied().unwrap_or(f64::NAN)
    }
}

/// Cached activations of one LSTM time step
struct LstmStep {
    z: Vec<f64>,
    i: Vec<f64>,
    f: Vec<f64>,
    g: Vec<f64>,
    o: Vec<f64>,
    c_prev: Vec<f64>,
    tanh_c: Vec<f64>,
}

struct ForwardCache {
    steps: Vec<Vec<LstmStep>>,
    /// Dropout multipliers per LSTM layer and emitted time step
    masks: Vec<Vec<Vec<f64>>>,
    dense_inputs: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Network {
    pub lstm: Vec<LstmWeights>,
    pub dense: Vec<DenseWeights>,
}

impl Network {
    /// Glorot-uniform weights, zero biases and a forget-gate bias of one.
    pub fn new(rng: &mut StdRng, units: usize, dense_units: usize) -> Self {
        let units = units.max(1);
        let dense_units = dense_units.max(1);
        Self {
            lstm: vec![init_lstm(rng, 1, units), init_lstm(rng, units, units)],
            dense: vec![init_dense(rng, units, dense_units), init_dense(rng, dense_units, 1)],
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            lstm: self
                .lstm
                .iter()
                .map(|l| LstmWeights {
                    input_size: l.input_size,
                    hidden_size: l.hidden_size,
                    weights: vec![0.0; l.weights.len()],
                    bias: vec![0.0; l.bias.len()],
                })
                .collect(),
            dense: self
                .dense
                .iter()
                .map(|d| DenseWeights {
                    input_size: d.input_size,
                    output_size: d.output_size,
                    weights: vec![0.0; d.weights.len()],
                    bias: vec![0.0; d.bias.len()],
                })
                .collect(),
        }
    }

    fn parameters(&self) -> Vec<&Vec<f64>> {
        self.lstm
            .iter()
            .flat_map(|l| [&l.weights, &l.bias])
            .chain(self.dense.iter().flat_map(|d| [&d.weights, &d.bias]))
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Vec<f64>> {
        self.lstm
            .iter_mut()
            .flat_map(|l| [&mut l.weights, &mut l.bias])
            .chain(self.dense.iter_mut().flat_map(|d| [&mut d.weights, &mut d.bias]))
            .collect()
    }

    /// Inference on one window (no dropout).
    pub fn predict(lstm: &[LstmWeights], dense: &[DenseWeights], window: &[f64]) -> f64 {
        let mut sequence: Vec<Vec<f64>> = window.iter().map(|v| vec![*v]).collect();
        for layer in lstm {
            sequence = lstm_forward(layer, &sequence).0;
        }
        let mut x = sequence.pop().unwrap_or_default();
        for layer in dense {
            x = dense_forward(layer, &x);
        }
        x.first().copied().unwrap_or(f64::NAN)
    }

    fn forward(&self, window: &[f64], dropout: f64, rng: &mut StdRng) -> (f64, ForwardCache) {
        let keep = 1.0 - dropout;
        let mut cache = ForwardCache {
            steps: Vec::with_capacity(self.lstm.len()),
            masks: Vec::with_capacity(self.lstm.len()),
            dense_inputs: Vec::with_capacity(self.dense.len()),
        };

        let mut sequence: Vec<Vec<f64>> = window.iter().map(|v| vec![*v]).collect();
        let last_layer = self.lstm.len().saturating_sub(1);
        for (index, layer) in self.lstm.iter().enumerate() {
            let (mut outputs, steps) = lstm_forward(layer, &sequence);
            if index == last_layer {
                outputs = outputs.split_off(outputs.len().saturating_sub(1));
            }
            let masks: Vec<Vec<f64>> = outputs
                .iter()
                .map(|h| {
                    h.iter()
                        .map(|_| {
                            if dropout <= 0.0 {
                                1.0
                            } else if rng.gen::<f64>() < keep {
                                1.0 / keep
                            } else {
                                0.0
                            }
                        })
                        .collect()
                })
                .collect();
            for (h, mask) in outputs.iter_mut().zip(masks.iter()) {
                for (v, m) in h.iter_mut().zip(mask.iter()) {
                    *v *= m;
                }
            }
            cache.steps.push(steps);
            cache.masks.push(masks);
            sequence = outputs;
        }

        let mut x = sequence.pop().unwrap_or_default();
        for layer in &self.dense {
            cache.dense_inputs.push(x.clone());
            x = dense_forward(layer, &x);
        }
        (x.first().copied().unwrap_or(f64::NAN), cache)
    }

    fn backward(&self, cache: &ForwardCache, d_output: f64, grad: &mut Network) {
        let mut dy = vec![d_output];
        for ((layer, input), layer_grad) in self
            .dense
            .iter()
            .zip(cache.dense_inputs.iter())
            .zip(grad.dense.iter_mut())
            .rev()
        {
            dy = dense_backward(layer, input, &dy, layer_grad);
        }

        let mut upstream = vec![dy];
        for index in (0..self.lstm.len()).rev() {
            let steps = &cache.steps[index];
            let masked: Vec<Vec<f64>> = upstream
                .iter()
                .zip(cache.masks[index].iter())
                .map(|(d, m)| d.iter().zip(m.iter()).map(|(a, b)| a * b).collect())
                .collect();

            let hidden = self.lstm[index].hidden_size;
            let d_outputs = if masked.len() == steps.len() {
                masked
            } else {
                let mut full = vec![vec![0.0; hidden]; steps.len()];
                if let (Some(last), Some(d)) = (full.last_mut(), masked.into_iter().next()) {
                    *last = d;
                }
                full
            };
            upstream = lstm_backward(&self.lstm[index], steps, &d_outputs, &mut grad.lstm[index]);
        }
    }

    /// Squared error of one window; adds `scale * d(error^2)` into `grad`.
    fn accumulate(
        &self,
        window: &[f64],
        target: f64,
        dropout: f64,
        scale: f64,
        rng: &mut StdRng,
        grad: &mut Network,
    ) -> f64 {
        let (output, cache) = self.forward(window, dropout, rng);
        let error = output - target;
        self.backward(&cache, 2.0 * error * scale, grad);
        error * error
    }

    /// Mini-batch training with per-epoch shuffling.
    pub fn fit(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[f64],
        validation: (&[Vec<f64>], &[f64]),
        plan: TrainingPlan,
        rng: &mut StdRng,
    ) -> TrainingHistory {
        let batch_size = plan.batch_size.max(1);
        let mut optimizer = Adam::new(plan.learning_rate, &self.parameters());
        let mut order: Vec<usize> = (0..inputs.len()).collect();
        let mut losses = Vec::with_capacity(plan.epochs);

        for _ in 0..plan.epochs {
            order.shuffle(rng);
            let mut total = 0.0;
            for batch in order.chunks(batch_size) {
                let mut grad = self.zeros_like();
                let scale = 1.0 / batch.len() as f64;
                for &i in batch {
                    let (input, target) = (&inputs[i], targets[i]);
                    total += self.accumulate(input, target, plan.dropout, scale, rng, &mut grad);
                }
                optimizer.step(self.parameters_mut(), &grad.parameters());
            }
            losses.push(total / inputs.len().max(1) as f64);
        }

        let (val_inputs, val_targets) = validation;
        let validation_loss = if val_inputs.is_empty() {
            None
        } else {
            let sum: f64 = val_inputs
                .iter()
                .zip(val_targets.iter())
                .map(|(x, y)| (Self::predict(&self.lstm, &self.dense, x) - y).powi(2))
                .sum();
            Some(sum / val_inputs.len() as f64)
        };

        TrainingHistory {
            losses,
            validation_loss,
        }
    }
}

fn init_lstm(rng: &mut StdRng, input_size: usize, hidden_size: usize) -> LstmWeights {
    let cols = input_size + hidden_size;
    let gates = 4 * hidden_size;
    let mut weights = Vec::with_capacity(gates * cols);
    for _ in 0..gates {
        for c in 0..cols {
            let fan_in = if c < input_size { input_size } else { hidden_size };
            weights.push(glorot_uniform(rng, fan_in, gates));
        }
    }
    let mut bias = vec![0.0; gates];
    for b in &mut bias[hidden_size..2 * hidden_size] {
        *b = 1.0;
    }
    LstmWeights {
        input_size,
        hidden_size,
        weights,
        bias,
    }
}

fn init_dense(rng: &mut StdRng, input_size: usize, output_size: usize) -> DenseWeights {
    DenseWeights {
        input_size,
        output_size,
        weights: (0..input_size * output_size)
            .map(|_| glorot_uniform(rng, input_size, output_size))
            .collect(),
        bias: vec![0.0; output_size],
    }
}

fn lstm_forward(layer: &LstmWeights, inputs: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<LstmStep>) {
    let hidden = layer.hidden_size;
    let cols = layer.input_size + hidden;
    let mut h = vec![0.0; hidden];
    let mut c = vec![0.0; hidden];
    let mut outputs = Vec::with_capacity(inputs.len());
    let mut steps = Vec::with_capacity(inputs.len());

    for x in inputs {
        let mut z = Vec::with_capacity(cols);
        z.extend_from_slice(x);
        z.extend_from_slice(&h);

        let mut a = layer.bias.clone();
        for (r, value) in a.iter_mut().enumerate() {
            let row = &layer.weights[r * cols..(r + 1) * cols];
            *value += row.iter().zip(z.iter()).map(|(w, v)| w * v).sum::<f64>();
        }

        let i: Vec<f64> = a[..hidden].iter().map(|v| sigmoid(*v)).collect();
        let f: Vec<f64> = a[hidden..2 * hidden].iter().map(|v| sigmoid(*v)).collect();
        let g: Vec<f64> = a[2 * hidden..3 * hidden].iter().map(|v| v.tanh()).collect();
        let o: Vec<f64> = a[3 * hidden..].iter().map(|v| sigmoid(*v)).collect();

        let c_prev = c;
        c = (0..hidden).map(|j| f[j] * c_prev[j] + i[j] * g[j]).collect();
        let tanh_c: Vec<f64> = c.iter().map(|v| v.tanh()).collect();
        h = (0..hidden).map(|j| o[j] * tanh_c[j]).collect();

        outputs.push(h.clone());
        steps.push(LstmStep {
            z,
            i,
            f,
            g,
            o,
            c_prev,
            tanh_c,
        });
    }
    (outputs, steps)
}

/// Returns the gradient with respect to each input vector.
fn lstm_backward(
    layer: &LstmWeights,
    steps: &[LstmStep],
    d_outputs: &[Vec<f64>],
    grad: &mut LstmWeights,
) -> Vec<Vec<f64>> {
    let hidden = layer.hidden_size;
    let input = layer.input_size;
    let cols = input + hidden;
    let mut dh_next = vec![0.0; hidden];
    let mut dc_next = vec![0.0; hidden];
    let mut d_inputs = vec![Vec::new(); steps.len()];

    for t in (0..steps.len()).rev() {
        let s = &steps[t];
        let mut da = vec![0.0; 4 * hidden];
        for j in 0..hidden {
            let dh = d_outputs[t][j] + dh_next[j];
            let d_o = dh * s.tanh_c[j];
            let dc = dh * s.o[j] * (1.0 - s.tanh_c[j] * s.tanh_c[j]) + dc_next[j];
            let d_i = dc * s.g[j];
            let d_g = dc * s.i[j];
            let d_f = dc * s.c_prev[j];
            dc_next[j] = dc * s.f[j];

            da[j] = d_i * s.i[j] * (1.0 - s.i[j]);
            da[hidden + j] = d_f * s.f[j] * (1.0 - s.f[j]);
            da[2 * hidden + j] = d_g * (1.0 - s.g[j] * s.g[j]);
            da[3 * hidden + j] = d_o * s.o[j] * (1.0 - s.o[j]);
        }

        let mut dz = vec![0.0; cols];
        for (r, &d) in da.iter().enumerate() {
            if d == 0.0 {
                continue;
            }
            grad.bias[r] += d;
            let offset = r * cols;
            for c in 0..cols {
                grad.weights[offset + c] += d * s.z[c];
                dz[c] += layer.weights[offset + c] * d;
            }
        }
        dh_next = dz.split_off(input);
        d_inputs[t] = dz;
    }
    d_inputs
}

fn dense_forward(layer: &DenseWeights, x: &[f64]) -> Vec<f64> {
    (0..layer.output_size)
        .map(|o| {
            let row = &layer.weights[o * layer.input_size..(o + 1) * layer.input_size];
            layer.bias[o] + row.iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>()
        })
        .collect()
}

fn dense_backward(
    layer: &DenseWeights,
    x: &[f64],
    dy: &[f64],
    grad: &mut DenseWeights,
) -> Vec<f64> {
    let mut dx = vec![0.0; layer.input_size];
    for (o, &d) in dy.iter().enumerate() {
        grad.bias[o] += d;
        let offset = o * layer.input_size;
        for k in 0..layer.input_size {
            grad.weights[offset + k] += d * x[k];
            dx[k] += layer.weights[offset + k] * d;
        }
    }
    dx
}

/// Adam with bias-corrected step size
struct Adam {
    learning_rate: f64,
    step: i32,
    first: Vec<Vec<f64>>,
    second: Vec<Vec<f64>>,
}

impl Adam {
    fn new(learning_rate: f64, parameters: &[&Vec<f64>]) -> Self {
        Self {
            learning_rate,
            step: 0,
            first: parameters.iter().map(|p| vec![0.0; p.len()]).collect(),
            second: parameters.iter().map(|p| vec![0.0; p.len()]).collect(),
        }
    }

    fn step(&mut self, parameters: Vec<&mut Vec<f64>>, gradients: &[&Vec<f64>]) {
        self.step += 1;
        let correction =
            (1.0 - BETA2.powi(self.step)).sqrt() / (1.0 - BETA1.powi(self.step));
        let lr = self.learning_rate * correction;

        for (index, (param, grad)) in parameters.into_iter().zip(gradients.iter()).enumerate() {
            let m = &mut self.first[index];
            let v = &mut self.second[index];
            for k in 0..param.len() {
                m[k] = BETA1 * m[k] + (1.0 - BETA1) * grad[k];
                v[k] = BETA2 * v[k] + (1.0 - BETA2) * grad[k] * grad[k];
                param[k] -= lr * m[k] / (v[k].sqrt() + EPSILON);
            }
        }
    }
}
