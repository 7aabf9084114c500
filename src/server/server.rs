use std::path::PathBuf;

use log::{debug, info, warn};
use rand::{SeedableRng, rngs::StdRng};

use super::{RoundReport, TrainingSummary, drop_stragglers, select_clients};
use crate::{
    FedConfig, FedErr, GradSet, GradientSource, ParamSet, Result,
    aggregation::{average_gradients, average_parameters},
    arch::Model,
    checkpoint,
    client::{Client, TrainRequest},
    data::Dataset,
    evaluation::evaluate,
    optimization::{FedOptimizer, FedSgd},
};

/// The short lived state of a round, from selection to aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundContext {
    pub round: usize,
    pub selected: Vec<usize>,
    pub active: Vec<usize>,
    /// The gradient snapshot sent to the clients, only for FedDANE and FedSGD.
    pub global_grads: Option<GradSet>,
}

/// The coordinator of the federation.
///
/// Owns the global model, every client and the held-out data, and runs the rounds one after
/// the other. The global model is replaced as a whole at the end of each successful round, so
/// a failed round leaves the previous one in place.
pub struct Server<M: Model> {
    config: FedConfig,
    model: M,
    clients: Vec<Client>,
    test_data: Dataset,
    global: ParamSet,
    rng: StdRng,
    round: usize,
    history: Vec<RoundReport>,
}

impl<M: Model> Server<M> {
    /// Creates a new `Server`.
    ///
    /// # Arguments
    /// * `config` - The simulation's configuration, validated here.
    /// * `model` - The model trained by the federation.
    /// * `partitions` - The clients' data, one partition per client in id order.
    /// * `test_data` - The held-out data used to evaluate the global model.
    ///
    /// # Returns
    /// A new `Server` whose clients all start from the same initial parameters.
    pub fn new(
        config: FedConfig,
        model: M,
        partitions: Vec<Dataset>,
        test_data: Dataset,
    ) -> Result<Self> {
        config.validate()?;

        if partitions.len() != config.num_clients.get() {
            return Err(FedErr::InvalidConfig(format!(
                "expected {} client partitions, got {}",
                config.num_clients,
                partitions.len()
            )));
        }

        if test_data.is_empty() {
            return Err(FedErr::EmptyInput {
                what: "evaluation data",
            });
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let global = model.init_params(&mut rng)?;

        let clients = partitions
            .into_iter()
            .enumerate()
            .map(|(id, data)| {
                let optimizer = FedOptimizer::from_config(&config);
                Client::new(id, data, global.clone(), optimizer, StdRng::from_rng(&mut rng))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            algorithm = config.algorithm.name(), clients = clients.len();
            "federation ready"
        );

        Ok(Self {
            config,
            model,
            clients,
            test_data,
            global,
            rng,
            round: 0,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &FedConfig {
        &self.config
    }

    /// The global model of the last completed round, or the initial one.
    pub fn global(&self) -> &ParamSet {
        &self.global
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    /// The amount of completed rounds.
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn history(&self) -> &[RoundReport] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.round >= self.config.num_rounds.get()
    }

    /// Runs every remaining round.
    ///
    /// # Returns
    /// The history of the run and the final global model, or the first error. On error the
    /// global model of the last completed round is still available through `global`.
    pub fn run(&mut self) -> Result<TrainingSummary> {
        while !self.is_finished() {
            self.run_round()?;
        }

        Ok(TrainingSummary {
            algorithm: self.config.algorithm,
            history: self.history.clone(),
            global: self.global.clone(),
        })
    }

    /// Writes the current global model to the configured checkpoint path.
    ///
    /// # Returns
    /// The path the model was written to.
    pub fn save_checkpoint(&self) -> Result<PathBuf> {
        let path = self.config.resolved_save_path();
        checkpoint::save(&path, &self.global)?;
        Ok(path)
    }

    /// Runs the next round: selection, dropout, global gradient, local training, aggregation
    /// and evaluation.
    pub fn run_round(&mut self) -> Result<RoundReport> {
        let round = self.round + 1;
        let ctx = self.plan_round(round)?;

        let request = TrainRequest {
            global_params: Some(&self.global),
            global_grads: ctx.global_grads.as_ref(),
        };

        let mut updates = Vec::with_capacity(ctx.active.len());
        for &id in &ctx.active {
            updates.push(self.clients[id].train(&self.model, &self.config, request)?);
        }

        updates.sort_by_key(|update| update.client_id);
        let client_loss = updates.iter().map(|u| u.loss).sum::<f32>() / updates.len() as f32;

        let next = if self.config.algorithm.averages_parameters() {
            let params: Vec<_> = updates.into_iter().map(|u| u.params).collect();
            average_parameters(&params)?
        } else {
            let mut next = self.global.clone();
            FedSgd::new(self.config.lr).step(&mut next, ctx.global_grads.as_ref())?;
            next
        };

        if !next.is_finite() {
            warn!(round = round; "aggregated model is not finite, keeping the previous one");
            return Err(FedErr::NonFinite { round });
        }

        self.global = next;
        self.round = round;

        let eval = evaluate(
            &self.model,
            &self.global,
            &self.test_data,
            self.config.batch_size,
        )?;

        let report = RoundReport {
            round,
            selected: ctx.selected,
            active: ctx.active,
            client_loss,
            accuracy: eval.accuracy,
            test_loss: eval.loss,
        };

        info!(
            round = round;
            "round {round:3} | accuracy {:.2}% | loss {:.4}",
            eval.accuracy * 100.0,
            eval.loss
        );

        self.history.push(report.clone());
        Ok(report)
    }

    /// Selects the round's participants and computes the gradient snapshot they receive.
    fn plan_round(&mut self, round: usize) -> Result<RoundContext> {
        let selected = select_clients(&mut self.rng, self.clients.len(), self.config.frac);
        let active = drop_stragglers(&mut self.rng, &selected, self.config.drop_rate);
        debug!(round = round; "selected {selected:?}, active {active:?}");

        let global_grads = self.global_gradient(&selected)?;

        Ok(RoundContext {
            round,
            selected,
            active,
            global_grads,
        })
    }

    /// Computes the gradient snapshot of the selected clients, if the algorithm needs one.
    fn global_gradient(&self, selected: &[usize]) -> Result<Option<GradSet>> {
        if !self.config.algorithm.needs_global_gradient() {
            return Ok(None);
        }

        let grads: Vec<GradSet> = match self.config.gradient_source {
            GradientSource::ModelProxy => selected
                .iter()
                .map(|&id| self.clients[id].params().clone())
                .collect(),
            GradientSource::TrueGradient => selected
                .iter()
                .map(|&id| self.clients[id].local_gradient(&self.model, &self.global))
                .collect::<Result<Vec<_>>>()?,
        };

        average_gradients(&grads).map(Some)
    }
}
