//! Loader plugins: resolve an `input` reference that didn't match any
//! sibling job or upstream engine name (`ResolvedInput::ExternalPath`) into
//! a `ResultObject`.

mod csv_loader;

pub use csv_loader::CsvLoader;
