mod automod;
mod ban;
mod lock;
mod modmail;
mod notify;
mod nuke;
mod usernote;

pub use automod::{AutomodDomainWatcher, AutomodUserWatcher};
pub use ban::Banner;
pub use lock::Locker;
pub use modmail::Modmailer;
pub use notify::Notifier;
pub use nuke::Nuker;
pub use usernote::ToolboxNoteAdder;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::{AppResult, Target};

/// A configured response to a matched report.
///
/// Implementations catch and log their own remote failures; an `Err`
/// from `act` means the local bookkeeping went wrong and the enclosing
/// pass decides what to do with it.
#[async_trait]
pub trait Action: Send + Sync {
    async fn act(
        &self,
        target: &Target,
        moderator: &str,
        action_id: i32,
        conn: &mut SqliteConnection,
    ) -> AppResult<()>;
}
