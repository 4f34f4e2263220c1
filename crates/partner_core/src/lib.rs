pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod normalize;
pub mod session;
pub mod source;

pub use adapter::{adapt, JoinedRow};
pub use config::{load_settings, load_settings_from, Settings};
pub use dispatch::{action_for, QueryDispatcher};
pub use encoder::{encode, SearchForm};
pub use error::QueryError;
pub use normalize::{normalize, normalize_value, NormalizedPage};
pub use session::{PartnerSearch, SearchSession, SearchTicket};
pub use source::{ActionEndpoint, QuerySource, RelationalReadModel};
