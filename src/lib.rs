pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod timeline;

pub use audio::{
    AudioFormat, AudioOutput, CaptureDevice, CaptureMixer, LogTrigger, MixReport, MixerConfig,
    OutputBus, SampleBuffer, SoundTrigger, ToneCaptureDevice,
};
pub use config::Config;
pub use engine::{Engine, EngineHandle};
pub use error::{CodecError, CorruptReason, SessionError, SessionResult};
pub use http::{create_router, AppState};
pub use session::{
    Session, SessionConfig, SessionController, SessionIdGenerator, SessionState, SessionStats,
    TickReport,
};
pub use store::{FsSessionStore, SessionStore, StoredSession};
pub use timeline::{
    EventDocument, EventKind, EventPayload, EventTimeline, PlaybackCursor, TimelineEvent,
};
