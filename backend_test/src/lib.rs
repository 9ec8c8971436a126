use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Turn an asynchronous test into a synchronous one that runs against a
/// fresh MongoDB database, injecting dependencies and dropping the database
/// however the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] (a
/// server whose voting engine uses that database), [`mongodb::Database`],
/// and `crate::model::mongodb::Coll<T>`.
///
/// The generated test is ignored by default, since it needs a running
/// `mongod`; run it with `cargo test -- --ignored`, pointing
/// `ELECTION_TEST_DB_URI` at the server if it is not on localhost.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        let args = TokenStream2::from(args);
        return syn::Error::new(args.span(), "`backend_test` takes no arguments")
            .into_compile_error()
            .into();
    }
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let (test_args, collection_idents, collection_types) = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    quote! {
        #[test]
        #[ignore = "requires a running MongoDB instance"]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db = db_client.database(&crate::database());
                crate::model::mongodb::ensure_indexes_exist(&db).await.unwrap();
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_db(&db))
                    .await
                    .unwrap();
                (rocket_client, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            let (rocket_client, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(
                    let #collection_idents = crate::model::mongodb::Coll::<#collection_types>::from_db(&db);
                )*

                runtime.block_on(#new_name(#(#test_args),* #(,#collection_idents)*));
            });

            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
#[allow(clippy::type_complexity)]
fn check_sig(sig: Signature) -> Result<(Vec<TokenStream2>, Vec<Ident>, Vec<Ident>), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut args = vec![];
    let mut collection_idents = vec![];
    let mut collection_types = vec![];

    for input in &sig.inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new(input.span(), "Test cannot take `self`"));
        };
        let (Pat::Ident(pat_ident), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) else {
            return Err(unexpected_arg(input));
        };

        if let Some(type_ident) = type_path.path.get_ident() {
            if type_ident == "Client" {
                if has_client {
                    return Err(syn::Error::new(
                        input.span(),
                        "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                    ));
                }
                has_client = true;
                args.push(quote! { rocket_client });
                continue;
            } else if type_ident == "Database" {
                if has_db {
                    return Err(syn::Error::new(
                        input.span(),
                        "Test cannot accept more than one `mongodb::Database`",
                    ));
                }
                has_db = true;
                args.push(quote! { db });
                continue;
            }
        } else if let Some(collection_type) = collection_type(type_path) {
            collection_idents.push(pat_ident.ident.clone());
            collection_types.push(collection_type);
            continue;
        }

        return Err(unexpected_arg(input));
    }

    // Collections are passed after the client and database, so those must
    // come first in the signature too.
    let collections_start = sig.inputs.len() - collection_idents.len();
    if let Some(misplaced) = sig
        .inputs
        .iter()
        .skip(collections_start)
        .find(|input| !is_collection(input))
    {
        return Err(syn::Error::new(
            misplaced.span(),
            "`Client` and `Database` must come before any `Coll<T>`",
        ));
    }

    Ok((args, collection_idents, collection_types))
}

/// The `T` in a `Coll<T>`, if that is what `type_path` is.
fn collection_type(type_path: &syn::TypePath) -> Option<Ident> {
    // The last path segment is the type itself.
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Coll" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    match generics.args.first() {
        Some(GenericArgument::Type(Type::Path(inner))) => inner.path.get_ident().cloned(),
        _ => None,
    }
}

fn is_collection(input: &FnArg) -> bool {
    match input {
        FnArg::Typed(pat_type) => match &*pat_type.ty {
            Type::Path(type_path) => collection_type(type_path).is_some(),
            _ => false,
        },
        FnArg::Receiver(_) => false,
    }
}

fn unexpected_arg(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `db_ident: Database` or `collection_ident: Coll<T>`",
    )
}
