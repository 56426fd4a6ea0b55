pub mod buffer;
pub mod device;
pub mod mixer;
pub mod mock;
pub mod sim;
pub mod wav;

pub use buffer::{AudioFormat, SampleBuffer};
pub use device::{AudioOutput, CaptureDevice, SoundTrigger};
pub use mixer::{CaptureMixer, MixReport, MixerConfig};
pub use sim::{LogTrigger, OutputBus, ToneCaptureDevice};
