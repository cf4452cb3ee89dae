// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the task store, audit ledger, and settings table.

pub mod audit;
pub mod settings;
pub mod tasks;
