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

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

/// Runs an `async fn` test on a fresh multi-threaded runtime.
///
/// Panics raised anywhere during the test, including on spawned tasks, are
/// logged and fail the test. `timeout_ms = N` fails the test when the body
/// runs longer than `N` milliseconds.
#[proc_macro_attribute]
pub fn slotwire_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut timeout_ms: Option<u64> = None;
    let arguments = syn::meta::parser(|meta| {
        if meta.path.is_ident("timeout_ms") {
            let value: LitInt = meta.value()?.parse()?;
            timeout_ms = Some(value.base10_parse()?);
            Ok(())
        } else {
            Err(meta.error("expected `timeout_ms = <milliseconds>`"))
        }
    });
    parse_macro_input!(attr with arguments);

    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    let async_name = syn::Ident::new(&format!("__{name}_async"), name.span());

    let run = match timeout_ms {
        Some(ms) => quote! {
            match ::slotwire_test::__private::tokio::time::timeout(
                std::time::Duration::from_millis(#ms),
                #async_name(),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => panic!("{} did not finish within {} ms", stringify!(#name), #ms),
            }
        },
        None => quote! { #async_name().await },
    };

    let output = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use std::panic;
            use std::sync::atomic::{AtomicBool, Ordering};
            use std::sync::Arc;
            use ::slotwire_test::__private::{parking_lot, tokio, tracing};

            #[derive(Default)]
            struct PanicRecord {
                occurred: AtomicBool,
                message: parking_lot::Mutex<Option<String>>,
                location: parking_lot::Mutex<Option<String>>,
            }

            let record = Arc::new(PanicRecord::default());
            let hook_record = Arc::clone(&record);

            let orig_hook = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                let payload = info.payload();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned());
                hook_record.occurred.store(true, Ordering::SeqCst);
                *hook_record.location.lock() =
                    info.location().map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                let cleaned = message
                    .clone()
                    .unwrap_or_else(|| "No error message".to_string())
                    .trim()
                    .replace('\n', " ");
                *hook_record.message.lock() = message;
                tracing::error!("Panic: {}", cleaned);
                orig_hook(info);
            }));

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build the test runtime");

            let result = runtime.block_on(async {
                let test_span = tracing::info_span!("slotwire_test", name = stringify!(#name));
                let _enter = test_span.enter();
                #run
            });
            drop(runtime);

            if record.occurred.load(Ordering::SeqCst) {
                let location = record
                    .location
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "unknown location".to_string());
                let message = record
                    .message
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "No error message".to_string());
                panic!("Panic at {}: {}", location, message.trim().replace('\n', " "));
            }

            result.unwrap()
        }

        async fn #async_name(#inputs) #output #body
    };

    output.into()
}
