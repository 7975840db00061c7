use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, ItemFn, PathArguments, Signature,
    Type,
};

/// Run an asynchronous test against a throwaway database, injecting its
/// parameters.
///
/// Each test gets a database of its own, with indexes in place and the
/// example election registered; the database is dropped afterwards, even if
/// the test panics. Parameters are injected by type, in any order:
///
/// - [`rocket::local::asynchronous::Client`]: the server, with example media.
/// - [`mongodb::Database`]: the test's database.
/// - `Coll<T>`: a typed collection from [`crate::model::mongodb::Coll`].
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "`backend_test` does not take arguments",
        )
        .into_compile_error()
        .into();
    }

    let mut item_fn = parse_macro_input!(input as ItemFn);
    let injected = match injections(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => return err.into_compile_error().into(),
    };
    let test_args: Vec<TokenStream2> = injected.iter().map(Injected::expr).collect();

    // The generated test takes the original name; the body becomes a future.
    let name = item_fn.sig.ident.clone();
    let body_name = format_ident!("{}_body", name);
    item_fn.sig.ident = body_name.clone();

    quote! {
        #[test]
        fn #name() {
            #item_fn

            // Setup and cleanup must outlive a panic on the test's runtime.
            let harness_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("backend-test-harness")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let test_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("backend-test-worker")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            let db_client = harness_runtime.block_on(crate::db_client());
            let db_name = crate::database();
            let db = db_client.database(&db_name);
            let server = harness_runtime.block_on(crate::rocket_for_db(db_client.clone(), &db_name));

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                test_runtime.block_on(async {
                    let rocket_client = rocket::local::asynchronous::Client::tracked(server)
                        .await
                        .unwrap();
                    #body_name(#(#test_args),*).await;
                });
            }));
            drop(test_runtime);

            harness_runtime.block_on(db.drop(None)).unwrap();

            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// A value the harness can supply to a test.
enum Injected {
    Client,
    Database,
    Collection(Type),
}

impl Injected {
    /// Expression producing the value inside the generated test.
    fn expr(&self) -> TokenStream2 {
        match self {
            Self::Client => quote! { rocket_client },
            Self::Database => quote! { db.clone() },
            Self::Collection(item) => {
                quote! { crate::model::mongodb::Coll::<#item>::from_db(&db) }
            }
        }
    }
}

/// Work out what to inject for each parameter of an async test.
fn injections(sig: &Signature) -> Result<Vec<Injected>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = Vec::new();
    for input in &sig.inputs {
        let item = injection(input)?;
        if matches!(item, Injected::Client) && injected.iter().any(|i| matches!(i, Injected::Client)) {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot accept more than one `Client`",
            ));
        }
        injected.push(item);
    }
    Ok(injected)
}

fn injection(input: &FnArg) -> Result<Injected, syn::Error> {
    let unknown = || {
        syn::Error::new(
            input.span(),
            "Expected a parameter of type `Client`, `Database` or `Coll<T>`",
        )
    };

    let FnArg::Typed(pat_type) = input else {
        return Err(unknown());
    };
    let Type::Path(type_path) = &*pat_type.ty else {
        return Err(unknown());
    };
    let Some(last) = type_path.path.segments.last() else {
        return Err(unknown());
    };

    match last.ident.to_string().as_str() {
        "Client" => Ok(Injected::Client),
        "Database" => Ok(Injected::Database),
        "Coll" => match &last.arguments {
            PathArguments::AngleBracketed(generics) => match generics.args.first() {
                Some(GenericArgument::Type(item)) => Ok(Injected::Collection(item.clone())),
                _ => Err(unknown()),
            },
            _ => Err(unknown()),
        },
        _ => Err(unknown()),
    }
}
