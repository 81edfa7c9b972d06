//! Block processor
//!
//! Turns a block number into the contract-creation candidates it contains.
//! No ERC20 classification happens here.

use tracing::warn;

use crate::models::errors::AppError;
use crate::models::types::{BlockData, Candidate};
use crate::providers::chain::BlockSource;

/// Candidates of a block, in transaction order. Transactions without a created
/// contract address are ignored.
pub fn extract_candidates(network: &str, block: &BlockData) -> Vec<Candidate> {
    block
        .transactions
        .iter()
        .filter_map(|tx| {
            let contract_address = tx.creates?;
            Some(Candidate {
                contract_address,
                creator_address: tx.from,
                block_number: block.number,
                block_timestamp: block.timestamp,
                transaction_hash: tx.hash,
                network: network.to_string(),
            })
        })
        .collect()
}

/// Fetch a block and extract its candidates. `None` means the block was skipped.
pub async fn process_block<S>(network: &str, source: &S, number: u64) -> Option<Vec<Candidate>>
where
    S: BlockSource + ?Sized,
{
    match source.block_with_transactions(number).await {
        Ok(Some(block)) => Some(extract_candidates(network, &block)),
        Ok(None) => {
            let err = AppError::block_unavailable(network, number);
            warn!("⚠️ [{}] {}, skipping", err.code_str(), err.message);
            None
        }
        Err(e) => {
            warn!("⚠️ [{}] Block {} fetch failed, skipping: {}", network, number, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::BlockTransaction;
    use alloy_primitives::{Address, B256};

    fn tx(n: u8, creates: Option<Address>) -> BlockTransaction {
        BlockTransaction {
            hash: B256::repeat_byte(n),
            from: Address::repeat_byte(0x10 + n),
            creates,
        }
    }

    #[test]
    fn test_only_creations_are_candidates_in_order() {
        let block = BlockData {
            number: 100,
            timestamp: 1_700_000_000,
            transactions: vec![
                tx(1, None),
                tx(2, Some(Address::repeat_byte(0xbb))),
                tx(3, None),
                tx(4, Some(Address::repeat_byte(0xaa))),
            ],
        };

        let candidates = extract_candidates("ethereum", &block);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].contract_address, Address::repeat_byte(0xbb));
        assert_eq!(candidates[0].creator_address, Address::repeat_byte(0x12));
        assert_eq!(candidates[0].transaction_hash, B256::repeat_byte(2));
        assert_eq!(candidates[1].contract_address, Address::repeat_byte(0xaa));
        assert!(candidates
            .iter()
            .all(|c| c.block_number == 100 && c.block_timestamp == 1_700_000_000 && c.network == "ethereum"));
    }

    #[test]
    fn test_block_without_creations() {
        let block = BlockData {
            number: 1,
            timestamp: 0,
            transactions: vec![tx(1, None), tx(2, None)],
        };
        assert!(extract_candidates("base", &block).is_empty());
    }
}
