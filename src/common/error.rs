// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use thiserror::Error;

/// Library error type.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq)]
pub enum BluetoothError {
    /// A blocking wait for a backend event exceeded its deadline. The native
    /// request is not retracted and may still complete later.
    #[error("timed out waiting to {0}")]
    Timeout(Operation),
    /// Reported when an entity that must already be known to the identity
    /// registry is missing. This means the backend handed back a native
    /// handle that was never registered, which breaks the assumption that
    /// native handles are stable across callbacks.
    #[error("lookup inconsistency: {0}")]
    LookupInconsistency(String),
    /// No backend exists for the host operating system.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    /// Reported when a value handed over by the backend can't be converted,
    /// e.g. a malformed UUID string.
    #[error("bad type conversion: {0}")]
    BadTypeConversion(String),
    /// Indicates that the operation was rejected because the system is not in
    /// a state required for the operation's execution.
    /// E.g. the user calls `read_value()` on a characteristic whose device
    /// has been dropped by the provider.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    /// Reported when the user calls an operation the active backend has no
    /// counterpart for.
    #[error("bluetooth operation not supported by system: {0}")]
    NotSupported(String),
    /// Wrapper around faults reported by the native backend, e.g. a D-Bus
    /// error reply other than a missing optional property.
    #[error("bluetooth system-level error: {0}")]
    System(String),
    /// Reported when a bug occurs inside the library. Whenever a seemingly
    /// impossible error condition arises where you could call `expect()`,
    /// return this error instead.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Blocking operations that can time out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    StartScan,
    StopScan,
    PowerOn,
    PowerOff,
    Connect,
    Disconnect,
    ReadValue,
    ReadRssi,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Operation::StartScan => "start scanning",
            Operation::StopScan => "stop scanning",
            Operation::PowerOn => "power on the adapter",
            Operation::PowerOff => "power off the adapter",
            Operation::Connect => "connect to the device",
            Operation::Disconnect => "disconnect from the device",
            Operation::ReadValue => "read the attribute value",
            Operation::ReadRssi => "read the RSSI",
        };
        f.write_str(what)
    }
}

impl From<uuid::Error> for BluetoothError {
    fn from(err: uuid::Error) -> Self {
        BluetoothError::BadTypeConversion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_operation() {
        let err = BluetoothError::Timeout(Operation::Connect);
        assert_eq!(
            err.to_string(),
            "timed out waiting to connect to the device"
        );
    }

    #[test]
    fn uuid_parse_error_is_bad_conversion() {
        let err: BluetoothError =
            uuid::Uuid::parse_str("not-a-uuid").unwrap_err().into();
        assert!(matches!(err, BluetoothError::BadTypeConversion(_)));
    }
}
