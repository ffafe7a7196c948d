//! Chain export: canonical block RLP, genesis to head.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use flate2::{write::GzEncoder, Compression};
use log::info;

use chainscope_store::ChainStore;

use crate::TransferError;

/// Writes every block from genesis to the current head into `out`, in
/// ascending number order. A mid-stream write failure aborts; the partial
/// output is the caller's to clean up.
pub fn export_blocks(store: &dyn ChainStore, out: &mut dyn Write) -> Result<u64, TransferError> {
    let head = store.current_block().ok_or(TransferError::EmptyChain)?;
    let mut written = 0u64;
    for number in 0..=head.number() {
        let block = store
            .block_by_number(number)
            .ok_or(TransferError::MissingBlock(number))?;
        out.write_all(&block.encoded())?;
        written += 1;
    }
    out.flush()?;
    info!("exported {written} blocks up to #{}", head.number());
    Ok(written)
}

/// Exports to a file; a `.gz` suffix selects gzip compression. Failure to
/// create the file is reported before anything is written.
pub fn export_to_path(
    store: &dyn ChainStore,
    path: impl AsRef<Path>,
) -> Result<u64, TransferError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    if is_gzip(path) {
        let mut out = GzEncoder::new(BufWriter::new(file), Compression::default());
        let written = export_blocks(store, &mut out)?;
        out.finish()?.flush()?;
        Ok(written)
    } else {
        let mut out = BufWriter::new(file);
        export_blocks(store, &mut out)
    }
}

pub(crate) fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}
