mod commit_task;
mod import_task;
mod manage_staging;
mod outbox;
mod verify_task;

pub use commit_task::CommitTaskUseCase;
pub use import_task::{ImportSheetRow, ImportStagingFileUseCase};
pub use manage_staging::ManageStagingUseCase;
pub use outbox::{OutboxDispatchOutput, OutboxDispatchUseCase};
pub use verify_task::{VerifyTaskOutput, VerifyTaskUseCase};
