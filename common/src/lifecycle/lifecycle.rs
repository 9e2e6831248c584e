/// Common shape for the gateway's long-lived background workers
/// (connection monitors, cache sweepers). `stop` must be idempotent.
pub trait Lifecycle {
    fn start(&self);

    fn stop(&self);
}
