//! Test fixtures for integration tests.

#![allow(dead_code)]

/// Format file bcp writes for `dbo.orders` in character mode.
pub const ORDERS_FORMAT_XML: &str = r#"<?xml version="1.0"?>
<BCPFORMAT xmlns="http://schemas.microsoft.com/sqlserver/2004/bulkload/format" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
 <RECORD>
  <FIELD ID="1" xsi:type="CharTerm" TERMINATOR="\t" MAX_LENGTH="12"/>
  <FIELD ID="2" xsi:type="CharTerm" TERMINATOR="\t" MAX_LENGTH="100" COLLATION="SQL_Latin1_General_CP1_CI_AS"/>
  <FIELD ID="3" xsi:type="CharTerm" TERMINATOR="\t" MAX_LENGTH="1"/>
  <FIELD ID="4" xsi:type="CharTerm" TERMINATOR="\r\n" MAX_LENGTH="24"/>
 </RECORD>
 <ROW>
  <COLUMN SOURCE="1" NAME="OrderId" xsi:type="SQLINT"/>
  <COLUMN SOURCE="2" NAME="Customer" xsi:type="SQLVARYCHAR"/>
  <COLUMN SOURCE="3" NAME="Shipped" xsi:type="SQLBIT"/>
  <COLUMN SOURCE="4" NAME="PlacedAt" xsi:type="SQLDATETIME"/>
 </ROW>
</BCPFORMAT>
"#;

/// Three orders: a full row, one with an empty customer and NULL date, and
/// one with a NULL customer.
pub const ORDERS_DATA: &[u8] =
    b"1\tAcme\t1\t2024-01-15 10:30:00.000\r\n2\t\0\t0\t\r\n3\t\t1\t2024-02-01 00:00:00.000\r\n";

pub const ORDERS_STDOUT: &str = "\nStarting copy...\n\n3 rows copied.\n\
    Network packet size (bytes): 4096\nClock Time (ms.) Total     : 15     Average : (200.00 rows per sec.)\n";

pub const INSERT_STDOUT: &str = "\nStarting copy...\n\n2 rows copied.\n";
