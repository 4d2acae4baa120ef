pub mod account_id;
pub mod error;
pub mod requests;
pub mod responses;
pub mod status;


pub use account_id::AccountId;
pub use error::{HederaError, Result};
pub use requests::{GrpcMethod, RequestOptions};
pub use responses::{ResponseHeader, TransactionResponse};
pub use status::Status;
