pub mod clock;
pub mod http_transport;
pub mod request_gate;
pub mod settings_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use http_transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use request_gate::{GatePermit, RequestGate, DEFAULT_GATE_TIMEOUT};
pub use settings_store::{keys, MemoryStore, SettingsStore, TomlFileStore};
