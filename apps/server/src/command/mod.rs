pub mod index;
pub mod search;
pub mod serve;

use crate::error::Result;

pub use index::IndexCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;

#[async_trait::async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
