// This file is part of opgas.
//
// opgas is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// opgas is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with opgas.
// If not, see https://www.gnu.org/licenses/.

#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! Contract interfaces consumed by opgas.
//!
//! Holds the entry point interfaces for v0.6 and v0.7 along with the interfaces
//! of the instrumented simulator builds that are swapped in at the entry point
//! address during estimation.

/// Simulator interfaces shared between entry point versions
pub mod common;
/// Entry point v0.6 interfaces
pub mod v0_6;
/// Entry point v0.7 interfaces
pub mod v0_7;
