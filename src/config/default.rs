// Author: Eshan Roy
// SPDX-License-Identifier: MIT

//! Default configuration values.

use super::schema::HostConfig;

/// Get the default configuration.
pub fn default_config() -> HostConfig {
    HostConfig::default()
}

/// Generate an example configuration file.
pub fn example_config() -> &'static str {
    r#"# hostlink configuration
# Author: Eshan Roy
# SPDX-License-Identifier: MIT

# Host process settings
[host]
# "fatal" aborts startup on the first plugin failure,
# "best_effort" skips the failing plugin and carries on.
startup_policy = "fatal"
drain_timeout_ms = 5000
config_dir = "etc"
state_dir = "var"

# Libraries statically linked into the host and exported to plugins.
# Plugins must not link any of these themselves.
[exports]
version = 1

[[exports.libraries]]
name = "libcore"
archive = "vendor/lib/libcore.a"
symbols = ["core_alloc", "core_free"]

[[exports.libraries]]
name = "liblog"
archive = "vendor/lib/liblog*.a"
symbols = ["log_write", "log_flush"]

# Platform link settings
[link]
prelink_object = "target/hostlink-exports.o"

# Plugins, loaded in declaration order and unloaded in reverse
[plugins]
directory = "plugins"
scan = false

[[plugins.entries]]
name = "router"
path = "plugins/librouter.so"
enabled = true
links = ["libpcre"]
settings = { listen = "0.0.0.0:1883" }

[[plugins.entries]]
name = "storage"
path = "plugins/libstorage.so"
enabled = false
"#
}
