mod entrypoint;
mod job;

pub(crate) use entrypoint::run_demo;
