// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Criterion benches for the `module_tape` builder live in `benches/`.
