mod fed_dane;
mod fed_prox;
mod fed_sgd;
mod gradient_descent;
mod optimizer;

pub use fed_dane::FedDane;
pub use fed_prox::FedProx;
pub use fed_sgd::FedSgd;
pub use gradient_descent::GradientDescent;
pub use optimizer::{FedOptimizer, StepRequest};
