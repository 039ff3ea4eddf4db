pub(crate) mod archive;
pub(crate) mod notify;
pub(crate) mod retention;
pub(crate) mod run;
pub(crate) mod run_log;
pub(crate) mod timestamp;
