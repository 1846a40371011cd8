pub mod debounce;
pub mod emitter;
pub mod persistence;
pub mod reconciler;
pub mod session;
pub mod supervisor;
pub mod transport;

pub use emitter::DebouncedEmitter;
pub use persistence::{DocumentPersistence, DocumentSnapshot, HttpPersistence};
pub use reconciler::{EchoState, EditorState, Reconciliation, UpdateReconciler};
pub use session::{CollabSession, SessionEvent};
pub use supervisor::{ChannelState, ReconnectionSupervisor};
pub use transport::{Connector, TransportEvent, TransportLink, WsConnector};
