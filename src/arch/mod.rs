mod mean;
mod model;
mod softmax;

pub use mean::MeanModel;
pub use model::Model;
pub use softmax::SoftmaxRegression;
