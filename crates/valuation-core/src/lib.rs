pub mod adjustment;
pub mod error;
pub mod normalize;
pub mod rating;
pub mod results;
pub mod stats;
pub mod traits;
pub mod types;
pub mod weights;

pub use adjustment::*;
pub use error::*;
pub use normalize::*;
pub use rating::*;
pub use results::*;
pub use traits::*;
pub use types::*;
pub use weights::*;
