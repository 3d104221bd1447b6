/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use slotwire_core::Value;
use tracing::debug;

use crate::common::{Invocation, SlotInvoker};
use crate::message::{Args, FromArgs, IntoArgs, SignalSlotError, SlotContext, SlotError, MAX_ARITY};

/// Overload whose parameters are the exact types of the tuple `A`.
pub(crate) fn typed_invoker<A, R, F>(callback: F) -> SlotInvoker
where
    A: FromArgs + 'static,
    R: IntoArgs,
    F: Fn(&SlotContext, A) -> Result<R, SlotError> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &SlotContext, values: &[Value]| match A::from_values(values) {
        Ok(args) => Invocation::Done(callback(ctx, args).map(IntoArgs::into_args)),
        Err(mismatch) => Invocation::Mismatch(mismatch),
    })
}

/// Overload that accepts any values of its arity.
pub(crate) fn raw_invoker<R, F>(callback: F) -> SlotInvoker
where
    R: IntoArgs,
    F: Fn(&SlotContext, Args) -> Result<R, SlotError> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &SlotContext, values: &[Value]| {
        Invocation::Done(callback(ctx, values.iter().cloned().collect()).map(IntoArgs::into_args))
    })
}

/// A named inbound endpoint with one callback per registered arity.
pub(crate) struct Slot {
    name: String,
    overloads: RwLock<BTreeMap<usize, SlotInvoker>>,
}

impl Slot {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: RwLock::new(BTreeMap::new()),
        }
    }

    pub(crate) fn add_overload(&self, arity: usize, invoker: SlotInvoker) -> Result<(), SignalSlotError> {
        if arity > MAX_ARITY {
            return Err(SignalSlotError::TooManyArguments(arity));
        }
        let mut overloads = self.overloads.write();
        if overloads.contains_key(&arity) {
            return Err(SignalSlotError::SlotAlreadyRegistered {
                slot: self.name.clone(),
                arity,
            });
        }
        overloads.insert(arity, invoker);
        Ok(())
    }

    pub(crate) fn arities(&self) -> Vec<usize> {
        self.overloads.read().keys().copied().collect()
    }

    /// Resolves the overload for `args` and runs it.
    ///
    /// More values than the largest registered arity is an error. Otherwise
    /// overloads with arity up to the number of values are tried from the
    /// highest down, each receiving the leading values it declares; the first
    /// whose parameter types match wins.
    pub(crate) fn invoke(&self, ctx: &SlotContext, args: &Args) -> Result<Args, SlotError> {
        let given = args.len();
        // Callbacks run without the table lock; they may register slots.
        let (registered, candidates): (Vec<usize>, Vec<(usize, SlotInvoker)>) = {
            let overloads = self.overloads.read();
            (
                overloads.keys().copied().collect(),
                overloads
                    .range(..=given)
                    .rev()
                    .map(|(arity, invoker)| (*arity, invoker.clone()))
                    .collect(),
            )
        };
        let mismatch = || SignalSlotError::ArityMismatch {
            name: self.name.clone(),
            given,
            registered: registered.clone(),
        };
        if registered.last().map_or(true, |max| given > *max) {
            return Err(mismatch().into());
        }
        for (arity, invoker) in candidates {
            match invoker(ctx, &args.values()[..arity]) {
                Invocation::Done(result) => return result,
                Invocation::Mismatch(reason) => {
                    debug!(slot = %self.name, arity, %reason, "Overload does not match");
                }
            }
        }
        Err(mismatch().into())
    }
}
