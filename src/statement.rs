//! Statement buffers as delivered by the wire codec
//!
//! A [`Statement`] is one contiguous client packet together with everything
//! the codec and classifier learned about it: the command byte, the
//! classification flag word, the detected operation, any affected table
//! names and the routing hints attached by upstream filters.

use crate::classify::{Command, Operation, QueryType};
use crate::hint::Hint;
use bytes::Bytes;

/// One classified client statement
#[derive(Debug, Clone)]
pub struct Statement {
    /// Packet payload, command byte first
    payload: Bytes,
    command: Command,
    classification: QueryType,
    operation: Operation,
    /// Routing hints in attachment order
    hints: Vec<Hint>,
    /// Codec-detected multi-statement packet
    multi_statement: bool,
    /// Table names the classifier extracted, used for temp-table tracking
    tables: Vec<String>,
}

impl Statement {
    /// Wrap a classified packet
    #[must_use]
    pub fn new(payload: Bytes, command: Command, classification: QueryType) -> Self {
        Self {
            payload,
            command,
            classification,
            operation: Operation::Undefined,
            hints: Vec::new(),
            multi_statement: false,
            tables: Vec::new(),
        }
    }

    /// A COM_QUERY statement built from SQL text
    #[must_use]
    pub fn query(sql: &str, classification: QueryType) -> Self {
        let mut payload = Vec::with_capacity(sql.len() + 1);
        payload.push(0x03);
        payload.extend_from_slice(sql.as_bytes());
        Self::new(Bytes::from(payload), Command::Query, classification)
    }

    /// The empty terminator packet of a LOAD DATA LOCAL INFILE stream
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Bytes::new(), Command::Other(0), QueryType::UNKNOWN)
    }

    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn with_multi_statement(mut self, multi: bool) -> Self {
        self.multi_statement = multi;
        self
    }

    #[must_use]
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hints.push(hint);
        self
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }

    #[must_use]
    pub const fn classification(&self) -> QueryType {
        self.classification
    }

    /// Router-side reclassification (temp-table reads, missing-master writes)
    pub fn add_classification(&mut self, flags: QueryType) {
        self.classification.insert(flags);
    }

    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    /// Attach a routing hint, preserving attachment order
    pub fn add_hint(&mut self, hint: Hint) {
        self.hints.push(hint);
    }

    #[must_use]
    pub const fn is_multi_statement(&self) -> bool {
        self.multi_statement
    }

    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Empty packets terminate a LOAD DATA LOCAL INFILE stream
    #[must_use]
    pub fn is_empty_packet(&self) -> bool {
        self.payload.is_empty()
    }

    /// SQL text of a COM_QUERY payload, for the hint filter
    ///
    /// Returns `None` for non-query commands and non-UTF-8 payloads.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        if !self.command.is_query() || self.payload.len() < 2 {
            return None;
        }
        std::str::from_utf8(&self.payload[1..]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builds_com_query_payload() {
        let stmt = Statement::query("SELECT 1", QueryType::READ);
        assert_eq!(stmt.payload()[0], 0x03);
        assert_eq!(stmt.sql(), Some("SELECT 1"));
        assert!(!stmt.is_empty_packet());
    }

    #[test]
    fn test_empty_packet() {
        let stmt = Statement::empty();
        assert!(stmt.is_empty_packet());
        assert_eq!(stmt.sql(), None);
    }

    #[test]
    fn test_sql_only_for_queries() {
        let stmt = Statement::new(
            Bytes::from_static(&[0x16, b'x']),
            Command::StmtPrepare,
            QueryType::PREPARE_STMT,
        );
        assert_eq!(stmt.sql(), None);
    }

    #[test]
    fn test_add_classification() {
        let mut stmt = Statement::query("SELECT * FROM t1", QueryType::READ);
        stmt.add_classification(QueryType::MASTER_READ);
        assert!(stmt.classification().contains(QueryType::READ));
        assert!(stmt.classification().contains(QueryType::MASTER_READ));
    }

    #[test]
    fn test_hint_order_preserved() {
        let mut stmt = Statement::query("SELECT 1", QueryType::READ);
        stmt.add_hint(Hint::RouteToNamed("server2".to_string()));
        stmt.add_hint(Hint::RouteToMaster);
        assert_eq!(stmt.hints().len(), 2);
        assert!(matches!(stmt.hints()[0], Hint::RouteToNamed(_)));
        assert!(matches!(stmt.hints()[1], Hint::RouteToMaster));
    }
}
