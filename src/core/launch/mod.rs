pub mod classpath;
pub mod task;
pub mod window;

pub use classpath::{build_classpath, extract_natives};
pub use task::{GameProcess, LaunchRequest, ProcessLauncher};
pub use window::{HeadlessWindow, WindowControl};
