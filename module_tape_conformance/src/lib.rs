// Copyright 2026 the Module Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conformance tests for the `module_tape` builder live in `tests/`.
