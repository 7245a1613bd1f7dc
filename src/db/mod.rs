pub mod gateway;
pub mod init;
pub mod meetings;
pub mod segments;
pub mod settings;

pub use gateway::{NewSegment, PersistenceGateway, SqliteGateway, StoredSegment};
pub use init::{init_db, migrate};
pub use meetings::{MeetingRecord, MeetingRepository};
pub use segments::SegmentRepository;
pub use settings::SettingsRepository;
