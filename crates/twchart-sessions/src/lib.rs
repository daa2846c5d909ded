pub mod builder;
pub mod chart;
pub mod error;
pub mod legacy;
pub mod parser;
pub mod store;
pub mod thermoworks;
pub mod time_expr;
pub mod types;
pub mod watcher;

pub use builder::{parse_session, parse_session_reader, SessionBuilder};
pub use chart::{ChartPoint, ProbeSeries};
pub use error::{LineError, ParseError, ProbePositionError, SensorError, TimeExprError};
pub use legacy::{fill_gaps, BreadData, StageSlot};
pub use parser::{parse_line, SessionPart};
pub use store::{load_session_from_file, session_id, SessionFilter, SessionStore, SessionSummary};
pub use thermoworks::{RowPolicy, SensorReader};
pub use time_expr::{is_next_day, resolve, TimeExpr};
pub use types::{Event, Probe, ProbePosition, Session, Stage, ThermoworksData};
pub use watcher::{SessionEvent, SessionWatcher};
