//! Statement classification labels consumed by the route decider
//!
//! The wire codec runs an external statement classifier and hands the router
//! a set of semantic flags per statement. The router never parses SQL; the
//! flag word below is the whole contract. Flags are combined with `|` and
//! tested with [`QueryType::contains`] so the decision table in the route
//! decider stays inspectable.

use std::fmt;

/// Classification flag word for a single statement
///
/// A statement usually carries one or two flags; `UNKNOWN` (the empty word)
/// is routed to the master like a write.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QueryType(u32);

impl QueryType {
    /// Unclassifiable statement, treated as a write
    pub const UNKNOWN: QueryType = QueryType(0);
    /// Plain read (SELECT and friends)
    pub const READ: QueryType = QueryType(1 << 0);
    /// Plain write
    pub const WRITE: QueryType = QueryType(1 << 1);
    /// Read that must see master state (e.g. temp-table reads)
    pub const MASTER_READ: QueryType = QueryType(1 << 2);
    /// Session-state-affecting write (SET, USE, ...)
    pub const SESSION_WRITE: QueryType = QueryType(1 << 3);
    /// User variable read
    pub const USERVAR_READ: QueryType = QueryType(1 << 4);
    /// User variable write
    pub const USERVAR_WRITE: QueryType = QueryType(1 << 5);
    /// Session system variable read
    pub const SYSVAR_READ: QueryType = QueryType(1 << 6);
    /// Global system variable read
    pub const GSYSVAR_READ: QueryType = QueryType(1 << 7);
    /// Global system variable write
    pub const GSYSVAR_WRITE: QueryType = QueryType(1 << 8);
    /// SHOW TABLES
    pub const SHOW_TABLES: QueryType = QueryType(1 << 9);
    /// BEGIN / START TRANSACTION
    pub const BEGIN_TRX: QueryType = QueryType(1 << 10);
    /// COMMIT
    pub const COMMIT: QueryType = QueryType(1 << 11);
    /// ROLLBACK
    pub const ROLLBACK: QueryType = QueryType(1 << 12);
    /// SET autocommit=1
    pub const ENABLE_AUTOCOMMIT: QueryType = QueryType(1 << 13);
    /// SET autocommit=0
    pub const DISABLE_AUTOCOMMIT: QueryType = QueryType(1 << 14);
    /// CREATE TEMPORARY TABLE
    pub const CREATE_TMP_TABLE: QueryType = QueryType(1 << 15);
    /// Read that touches a temporary table
    pub const READ_TMP_TABLE: QueryType = QueryType(1 << 16);
    /// Text-protocol PREPARE
    pub const PREPARE_NAMED_STMT: QueryType = QueryType(1 << 17);
    /// Binary-protocol prepare
    pub const PREPARE_STMT: QueryType = QueryType(1 << 18);
    /// EXECUTE of a prepared statement
    pub const EXEC_STMT: QueryType = QueryType(1 << 19);

    /// The empty flag word
    #[must_use]
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// True if every flag in `other` is set in `self`
    #[must_use]
    #[inline]
    pub const fn contains(self, other: QueryType) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag in `other` is set in `self`
    #[must_use]
    #[inline]
    pub const fn intersects(self, other: QueryType) -> bool {
        self.0 & other.0 != 0
    }

    /// True if no flags are set
    #[must_use]
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set the flags in `other`
    #[inline]
    pub fn insert(&mut self, other: QueryType) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for QueryType {
    type Output = QueryType;

    #[inline]
    fn bitor(self, rhs: QueryType) -> QueryType {
        QueryType(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for QueryType {
    #[inline]
    fn bitor_assign(&mut self, rhs: QueryType) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: &[(QueryType, &str)] = &[
            (QueryType::READ, "READ"),
            (QueryType::WRITE, "WRITE"),
            (QueryType::MASTER_READ, "MASTER_READ"),
            (QueryType::SESSION_WRITE, "SESSION_WRITE"),
            (QueryType::USERVAR_READ, "USERVAR_READ"),
            (QueryType::USERVAR_WRITE, "USERVAR_WRITE"),
            (QueryType::SYSVAR_READ, "SYSVAR_READ"),
            (QueryType::GSYSVAR_READ, "GSYSVAR_READ"),
            (QueryType::GSYSVAR_WRITE, "GSYSVAR_WRITE"),
            (QueryType::SHOW_TABLES, "SHOW_TABLES"),
            (QueryType::BEGIN_TRX, "BEGIN_TRX"),
            (QueryType::COMMIT, "COMMIT"),
            (QueryType::ROLLBACK, "ROLLBACK"),
            (QueryType::ENABLE_AUTOCOMMIT, "ENABLE_AUTOCOMMIT"),
            (QueryType::DISABLE_AUTOCOMMIT, "DISABLE_AUTOCOMMIT"),
            (QueryType::CREATE_TMP_TABLE, "CREATE_TMP_TABLE"),
            (QueryType::READ_TMP_TABLE, "READ_TMP_TABLE"),
            (QueryType::PREPARE_NAMED_STMT, "PREPARE_NAMED_STMT"),
            (QueryType::PREPARE_STMT, "PREPARE_STMT"),
            (QueryType::EXEC_STMT, "EXEC_STMT"),
        ];

        if self.is_empty() {
            return write!(f, "UNKNOWN");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(*flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// MySQL wire command byte of the client packet, as decoded by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// COM_QUERY
    Query,
    /// COM_QUIT
    Quit,
    /// COM_PING
    Ping,
    /// COM_STMT_PREPARE
    StmtPrepare,
    /// COM_STMT_EXECUTE
    StmtExecute,
    /// COM_STMT_SEND_LONG_DATA
    StmtSendLongData,
    /// COM_STMT_CLOSE
    StmtClose,
    /// Any other command byte
    Other(u8),
}

impl Command {
    /// Whether the server sends a reply to this command
    ///
    /// QUIT, STMT_SEND_LONG_DATA and STMT_CLOSE are fire-and-forget; routing
    /// them must not bump the expected-response count.
    #[must_use]
    pub const fn expects_response(self) -> bool {
        !matches!(
            self,
            Command::Quit | Command::StmtSendLongData | Command::StmtClose
        )
    }

    /// Whether the codec should collect the complete reply before delivery
    ///
    /// The prepare response spans several packets and must reach the client
    /// in one piece.
    #[must_use]
    pub const fn collects_result(self) -> bool {
        matches!(self, Command::StmtPrepare)
    }

    /// True for COM_QUERY
    #[must_use]
    pub const fn is_query(self) -> bool {
        matches!(self, Command::Query)
    }
}

/// Statement operation detected by the classifier
///
/// Only the operations the router reacts to are distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Undefined,
    /// LOAD DATA [LOCAL] INFILE
    Load,
    /// CALL procedure
    Call,
    /// DROP TABLE
    Drop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_contains() {
        let qt = QueryType::READ | QueryType::USERVAR_READ;
        assert!(qt.contains(QueryType::READ));
        assert!(qt.contains(QueryType::USERVAR_READ));
        assert!(!qt.contains(QueryType::WRITE));
        assert!(qt.contains(QueryType::READ | QueryType::USERVAR_READ));
    }

    #[test]
    fn test_query_type_insert() {
        let mut qt = QueryType::READ;
        qt.insert(QueryType::MASTER_READ);
        assert!(qt.contains(QueryType::READ));
        assert!(qt.contains(QueryType::MASTER_READ));
    }

    #[test]
    fn test_query_type_unknown_is_empty() {
        assert!(QueryType::UNKNOWN.is_empty());
        assert!(!QueryType::WRITE.is_empty());
        assert_eq!(format!("{:?}", QueryType::UNKNOWN), "UNKNOWN");
    }

    #[test]
    fn test_query_type_debug_lists_flags() {
        let qt = QueryType::READ | QueryType::SHOW_TABLES;
        let s = format!("{:?}", qt);
        assert!(s.contains("READ"));
        assert!(s.contains("SHOW_TABLES"));
    }

    #[test]
    fn test_command_response_expectation() {
        assert!(Command::Query.expects_response());
        assert!(Command::StmtPrepare.expects_response());
        assert!(!Command::Quit.expects_response());
        assert!(!Command::StmtSendLongData.expects_response());
        assert!(!Command::StmtClose.expects_response());
    }

    #[test]
    fn test_command_collects_result_only_for_prepare() {
        assert!(Command::StmtPrepare.collects_result());
        assert!(!Command::Query.collects_result());
        assert!(!Command::StmtExecute.collects_result());
    }
}
