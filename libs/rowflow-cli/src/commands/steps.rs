// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use rowflow::StepRegistry;

pub fn list() {
    for step_type in StepRegistry::with_builtins().step_types() {
        println!("{}", step_type);
    }
}
