// Copyright (c) 2022, Zachary D. Olkin.
// This code is provided under the MIT license.

//! Device agnostic driver for the LIS3MDL 3-axis magnetometer.
//! The driver depends on embedded-hal, so as long as the HAL you use implements those traits, then
//! this driver should be compatible.
//!
//! The data sheet for this device can be found [here](https://www.st.com/resource/en/datasheet/lis3mdl.pdf).
//!
//! The driver is split into a register transport (SPI or I2C), a configuration layer that owns the
//! output data rate and full scale tables, and a triggered capture path. The capture path is split
//! in two: a non-blocking half that runs in the interrupt handler and only takes a timestamp, and a
//! deferred half that runs in task context, reads the enabled axes over the bus and assembles a
//! fixed layout record:
//!
//! ```text
//! | X (i16 LE) | Y (i16 LE) | Z (i16 LE) | pad to 8 | timestamp (i64 LE, ns) |
//! ```
//!
//! Only the axes selected in the [`ScanMask`](lis3mdl::channel::ScanMask) are present, always in
//! X, Y, Z order, and the timestamp always starts on an 8 byte boundary.
//!
//! One driver instance owns one device. The driver assumes exclusive control of the bus, so if the
//! bus is shared use an `embedded-hal-bus` device wrapper.
//!
//! Logging goes through `defmt` when the `defmt` feature is enabled and through the `log` facade
//! otherwise. The `rtt` feature also links `defmt-rtt` and `panic-probe` for on-target builds.

#![warn(missing_docs)]
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "rtt")]
use defmt_rtt as _; // global logger
#[cfg(feature = "rtt")]
use panic_probe as _;

#[macro_use]
mod fmt;

/// Main module that holds the transport, configuration and capture sub modules.
/// Also holds the register map, the error type and the register interface trait shared between them.
pub mod lis3mdl;
