mod endpoint;
mod socket_opts;

pub use endpoint::{FramedEndpoint, run_liveness_loop};
pub use socket_opts::apply_standard_socket_options;
