use log::debug;
use rand::{rngs::StdRng, seq::SliceRandom};

use crate::{
    FedConfig, FedErr, GradSet, ParamSet, Result,
    arch::Model,
    data::Dataset,
    optimization::{FedOptimizer, StepRequest},
};

/// The global state a client receives at the start of its local training.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainRequest<'a> {
    /// When present the client starts from these parameters, otherwise from its own.
    pub global_params: Option<&'a ParamSet>,
    /// The server's gradient snapshot, consumed by FedDANE and FedSGD.
    pub global_grads: Option<&'a GradSet>,
}

/// What a client sends back to the server after training.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientUpdate {
    pub client_id: usize,
    pub params: ParamSet,
    /// Mean batch loss of the last local epoch.
    pub loss: f32,
    pub samples: usize,
}

/// A participant of the federation.
///
/// Owns a private data partition, its own copy of the model's parameters, an optimizer whose
/// state (e.g. the momentum) survives across rounds, and a random number generator used to
/// shuffle its batches.
#[derive(Debug, Clone)]
pub struct Client {
    id: usize,
    data: Dataset,
    params: ParamSet,
    optimizer: FedOptimizer,
    rng: StdRng,
    order: Vec<usize>,
}

impl Client {
    /// Creates a new `Client`.
    ///
    /// # Arguments
    /// * `id` - The client's stable identifier.
    /// * `data` - The client's local partition.
    /// * `params` - The initial local parameters.
    /// * `optimizer` - The optimizer of the federated algorithm.
    /// * `rng` - The random number generator used to shuffle the local data.
    ///
    /// # Returns
    /// A new `Client`, or an `EmptyInput` error if the partition has no samples.
    pub fn new(
        id: usize,
        data: Dataset,
        params: ParamSet,
        optimizer: FedOptimizer,
        rng: StdRng,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(FedErr::EmptyInput {
                what: "client partition",
            });
        }

        let order = (0..data.len()).collect();

        Ok(Self {
            id,
            data,
            params,
            optimizer,
            rng,
            order,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn samples(&self) -> usize {
        self.data.len()
    }

    /// The client's current local parameters.
    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn optimizer(&self) -> &FedOptimizer {
        &self.optimizer
    }

    /// Runs the local epochs of a round over the client's partition.
    ///
    /// # Arguments
    /// * `model` - The model that computes the loss and gradients.
    /// * `config` - The simulation's configuration.
    /// * `request` - The global state sent by the server.
    ///
    /// # Returns
    /// The updated local parameters and the last epoch's loss.
    pub fn train<M: Model>(
        &mut self,
        model: &M,
        config: &FedConfig,
        request: TrainRequest<'_>,
    ) -> Result<ClientUpdate> {
        let TrainRequest {
            global_params,
            global_grads,
        } = request;

        if let Some(global) = global_params {
            self.params = global.clone();
        }

        let mut epoch_loss = 0.0;

        for epoch in 1..=config.epochs_per_round() {
            self.order.shuffle(&mut self.rng);

            let mut total = 0.0;
            let mut batches = 0;

            for batch in self.data.batches(&self.order, config.batch_size) {
                let (loss, grad) = model.loss_and_grad(&self.params, batch.x.view(), &batch.y)?;

                let step = StepRequest::new(&grad)
                    .with_global_params(global_params)
                    .with_global_grads(global_grads);
                self.optimizer.step(&mut self.params, step)?;

                total += loss;
                batches += 1;
            }

            epoch_loss = total / batches as f32;
            debug!(client_id = self.id, epoch = epoch; "epoch loss {epoch_loss:.4}");
        }

        Ok(ClientUpdate {
            client_id: self.id,
            params: self.params.clone(),
            loss: epoch_loss,
            samples: self.data.len(),
        })
    }

    /// Computes the mean gradient of the whole local partition at `params`.
    ///
    /// Leaves the client's state untouched.
    pub fn local_gradient<M: Model>(&self, model: &M, params: &ParamSet) -> Result<GradSet> {
        let (_, grad) = model.loss_and_grad(params, self.data.x(), self.data.y())?;
        Ok(grad)
    }
}
