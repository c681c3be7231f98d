mod deadline;

pub use deadline::RequestDeadline;
