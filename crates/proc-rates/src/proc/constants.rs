// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Default locations of the `/proc` files read by the counter sources.
//!
//! File names are relative so they can be resolved against a configurable
//! base directory (for example a host `/proc` mounted into a container).

/// Path to `/proc` directory (root of proc filesystem).
pub const PROC_PATH: &str = "/proc";

/// `stat`: CPU time in clock ticks, run queue and blocked task counts, and on
/// very old kernels the `page`/`swap` lines.
pub const STAT_FILE: &str = "stat";

/// `vmstat`: virtual memory counters, including paging and swapping.
pub const VMSTAT_FILE: &str = "vmstat";

/// `loadavg`: load averages, runnable/total scheduling entities and the last
/// PID handed out by the kernel.
pub const LOADAVG_FILE: &str = "loadavg";

/// Paging and swapping counters, in the order they are reported.
pub const PAGING_KEYS: [&str; 4] = ["pgpgin", "pgpgout", "pswpin", "pswpout"];

/// Column names of the aggregate `cpu` line in `stat`.
///
/// Older kernels report fewer columns; the first four are always present.
pub const CPU_COLUMNS: [&str; 10] = [
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];
