// Custom types that are widely used are defined here.
use sqlx::{SqliteConnection, SqlitePool};

pub type Db = SqlitePool;

// A single connection, either from the pool or inside a transaction.
pub type Conn = SqliteConnection;

// Database ID types.
pub type GroupId = i64;
pub type TeamId = i64;
pub type MatchId = i64;

// 1-based position of a fixture within its stage.
pub type Slot = u16;

pub type Goals = u8;
