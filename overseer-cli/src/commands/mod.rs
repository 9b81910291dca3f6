pub mod chat;
pub mod history;
pub mod plan;
pub mod resume;
pub mod run;
pub mod simulate;
pub mod status;

pub use chat::cmd_chat;
pub use history::cmd_history;
pub use plan::cmd_plan;
pub use resume::cmd_resume;
pub use run::cmd_run;
pub use simulate::cmd_simulate;
pub use status::cmd_status;
