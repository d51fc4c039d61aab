// Copyright (c) 2026 Codegen-Link Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging setup for the binary. The library only uses the `log` facade.

use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Default filter for the given debug setting. `RUST_LOG` takes precedence.
pub fn default_spec(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Start logging to stderr. Keep the returned handle alive for the life of the program.
pub fn init_logging(debug: bool) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(default_spec(debug))?
        .log_to_stderr()
        .start()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_level() {
        assert_eq!(default_spec(false), "info");
        assert_eq!(default_spec(true), "debug");
    }
}
