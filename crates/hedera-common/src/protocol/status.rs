//! Precheck status codes.
//!
//! A node answers every transaction or query with a status before it does
//! anything else with it. The numbering follows the network's response code
//! table; codes this crate has no name for survive as
//! [`Status::Unrecognized`] so nothing is lost on the way to the caller.

use std::fmt;

use serde::{Serialize, Serializer};

macro_rules! statuses {
    ($($(#[$doc:meta])* $name:ident = $code:literal => $text:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $($(#[$doc])* $name,)*
            /// A code this crate has no name for.
            Unrecognized(i32),
        }

        impl Status {
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => Status::$name,)*
                    other => Status::Unrecognized(other),
                }
            }

            pub fn code(&self) -> i32 {
                match self {
                    $(Status::$name => $code,)*
                    Status::Unrecognized(code) => *code,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Status::$name => $text,)*
                    Status::Unrecognized(_) => "UNRECOGNIZED",
                }
            }
        }
    };
}

statuses! {
    /// Precheck passed.
    Ok = 0 => "OK",
    InvalidTransaction = 1 => "INVALID_TRANSACTION",
    PayerAccountNotFound = 2 => "PAYER_ACCOUNT_NOT_FOUND",
    InvalidNodeAccount = 3 => "INVALID_NODE_ACCOUNT",
    TransactionExpired = 4 => "TRANSACTION_EXPIRED",
    InvalidTransactionStart = 5 => "INVALID_TRANSACTION_START",
    InvalidTransactionDuration = 6 => "INVALID_TRANSACTION_DURATION",
    InvalidSignature = 7 => "INVALID_SIGNATURE",
    MemoTooLong = 8 => "MEMO_TOO_LONG",
    InsufficientTxFee = 9 => "INSUFFICIENT_TX_FEE",
    InsufficientPayerBalance = 10 => "INSUFFICIENT_PAYER_BALANCE",
    DuplicateTransaction = 11 => "DUPLICATE_TRANSACTION",
    /// The node is overloaded and asks to be tried again shortly.
    Busy = 12 => "BUSY",
    NotSupported = 13 => "NOT_SUPPORTED",
    InvalidFileId = 14 => "INVALID_FILE_ID",
    InvalidAccountId = 15 => "INVALID_ACCOUNT_ID",
    InvalidContractId = 16 => "INVALID_CONTRACT_ID",
    InvalidTransactionId = 17 => "INVALID_TRANSACTION_ID",
    ReceiptNotFound = 18 => "RECEIPT_NOT_FOUND",
    RecordNotFound = 19 => "RECORD_NOT_FOUND",
    InvalidSolidityId = 20 => "INVALID_SOLIDITY_ID",
    Unknown = 21 => "UNKNOWN",
    Success = 22 => "SUCCESS",
    FailInvalid = 23 => "FAIL_INVALID",
    FailFee = 24 => "FAIL_FEE",
    FailBalance = 25 => "FAIL_BALANCE",
    KeyRequired = 26 => "KEY_REQUIRED",
    BadEncoding = 27 => "BAD_ENCODING",
    InsufficientAccountBalance = 28 => "INSUFFICIENT_ACCOUNT_BALANCE",
    /// The platform has a backlog and did not create the transaction.
    PlatformTransactionNotCreated = 64 => "PLATFORM_TRANSACTION_NOT_CREATED",
    /// The node is starting up or reconnecting and not yet accepting work.
    PlatformNotActive = 184 => "PLATFORM_NOT_ACTIVE",
}

impl Status {
    /// Statuses meaning "try again shortly". Every other non-success status
    /// is the network's final word on the request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Status::Busy | Status::PlatformTransactionNotCreated | Status::PlatformNotActive
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Ok | Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unrecognized(code) => write!(f, "UNRECOGNIZED({})", code),
            other => f.write_str(other.name()),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status::from_code(code)
    }
}
