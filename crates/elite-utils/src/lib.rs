mod error;
mod recipe_file;
mod repeater;
mod scale;
mod thread;

pub use error::{DriverError, DriverResult};
pub use recipe_file::read_recipe_lines;
pub use repeater::Repeater;
pub use scale::{COMMON_ZOOM_RATIO, POS_ZOOM_RATIO, TIME_ZOOM_RATIO, scale_to_i32, unscale_from_i32};
pub use thread::spawn_named;
