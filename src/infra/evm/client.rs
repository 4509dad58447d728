// Responsible for all communication with the allowlist contract.

use crate::domain::commitment::{AllowlistContract, RootPublisher};
use crate::domain::model::{h256_to_hex, Address};
use alloy::network::ReceiptResponse;
use alloy::primitives::{Address as EvmAddress, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use anyhow::Context;
use async_trait::async_trait;
use primitive_types::H256;
use tracing::{debug, info};

/// Gas limit used for the owner-only setters, same as the web frontend used.
const SETTER_GAS_LIMIT: u64 = 100_000;

sol! {
    #[sol(rpc)]
    interface IAllowlistNft {
        function merkleRoot() external view returns (bytes32);
        function setMerkleRoot(bytes32 root) external;
        function whitelistOnly() external view returns (bool);
        function setWhitelistOnly(bool enabled) external;
        function isWhitelisted(address account, bytes32[] calldata proof) external view returns (bool);
    }
}

fn evm_address(address: &Address) -> EvmAddress {
    EvmAddress::from(address.as_h160().0)
}

/// Reads and writes the allowlist contract.
///
/// Transactions are signed locally when a private key is configured. With only
/// a sender address they go out as `eth_sendTransaction`, so the node must
/// hold that account (a local dev node, or one with an unlocked key).
pub struct EvmRootPublisher {
    contract: IAllowlistNft::IAllowlistNftInstance<DynProvider>,
    sender: Option<EvmAddress>,
}

impl EvmRootPublisher {
    pub fn connect(
        rpc_url: &str,
        contract: Address,
        private_key: Option<&str>,
        from: Option<Address>,
    ) -> anyhow::Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("EVM_RPC_URL is not a valid URL: {}", rpc_url))?;

        let (provider, sender) = match private_key {
            Some(raw) => {
                let signer: PrivateKeySigner = raw
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("EVM_PRIVATE_KEY is not a valid secp256k1 key"))?;
                let sender = signer.address();
                if let Some(from) = from {
                    if evm_address(&from) != sender {
                        return Err(anyhow::anyhow!(
                            "EVM_FROM {} does not match the account of EVM_PRIVATE_KEY {}",
                            from,
                            sender
                        ));
                    }
                }
                let provider = ProviderBuilder::new().wallet(signer).connect_http(url).erased();
                (provider, Some(sender))
            }
            None => {
                let provider = ProviderBuilder::new().connect_http(url).erased();
                (provider, from.as_ref().map(evm_address))
            }
        };

        Ok(Self {
            contract: IAllowlistNft::new(evm_address(&contract), provider),
            sender,
        })
    }

    pub async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(self.contract.provider().get_chain_id().await?)
    }

    fn sender(&self) -> anyhow::Result<EvmAddress> {
        self.sender.ok_or_else(|| {
            anyhow::anyhow!("EVM_PRIVATE_KEY or EVM_FROM must be set to send transactions")
        })
    }
}

#[async_trait]
impl RootPublisher for EvmRootPublisher {
    async fn published_root(&self) -> anyhow::Result<H256> {
        let root = self
            .contract
            .merkleRoot()
            .call()
            .await
            .context("merkleRoot() call failed")?;
        Ok(H256(root.0))
    }

    async fn publish_root(&self, root: H256) -> anyhow::Result<()> {
        let sender = self.sender()?;
        let pending = self
            .contract
            .setMerkleRoot(B256::from(root.0))
            .from(sender)
            .gas(SETTER_GAS_LIMIT)
            .send()
            .await
            .context("setMerkleRoot submission failed")?;
        debug!(tx_hash = %pending.tx_hash(), "setMerkleRoot submitted");

        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(anyhow::anyhow!(
                "setMerkleRoot transaction {} reverted",
                receipt.transaction_hash()
            ));
        }

        info!(
            root = %h256_to_hex(&root),
            tx_hash = %receipt.transaction_hash(),
            "wrote new root to the allowlist contract"
        );
        Ok(())
    }
}

#[async_trait]
impl AllowlistContract for EvmRootPublisher {
    async fn whitelist_only(&self) -> anyhow::Result<bool> {
        Ok(self
            .contract
            .whitelistOnly()
            .call()
            .await
            .context("whitelistOnly() call failed")?)
    }

    async fn set_whitelist_only(&self, enabled: bool) -> anyhow::Result<()> {
        let sender = self.sender()?;
        let receipt = self
            .contract
            .setWhitelistOnly(enabled)
            .from(sender)
            .gas(SETTER_GAS_LIMIT)
            .send()
            .await
            .context("setWhitelistOnly submission failed")?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(anyhow::anyhow!(
                "setWhitelistOnly transaction {} reverted",
                receipt.transaction_hash()
            ));
        }
        info!(enabled, tx_hash = %receipt.transaction_hash(), "updated whitelistOnly on the contract");
        Ok(())
    }

    async fn is_whitelisted(&self, address: Address, proof: &[H256]) -> anyhow::Result<bool> {
        let proof: Vec<B256> = proof.iter().map(|h| B256::from(h.0)).collect();
        Ok(self
            .contract
            .isWhitelisted(evm_address(&address), proof)
            .call()
            .await
            .context("isWhitelisted() call failed")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn contract_address() -> Address {
        format!("0x{}", "12".repeat(20)).parse().unwrap()
    }

    async fn mock_rpc(server: &mut mockito::ServerGuard, method: &str, result: &str) {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn reads_root_from_eth_call() {
        let mut server = mockito::Server::new_async().await;
        let word = format!("0x{}", "ab".repeat(32));
        mock_rpc(&mut server, "eth_call", &word).await;

        let client = EvmRootPublisher::connect(&server.url(), contract_address(), None, None).unwrap();
        assert_eq!(client.published_root().await.unwrap(), H256::repeat_byte(0xab));
    }

    #[tokio::test]
    async fn decodes_boolean_results() {
        let mut server = mockito::Server::new_async().await;
        let word = format!("0x{:0>64}", "1");
        mock_rpc(&mut server, "eth_call", &word).await;
        mock_rpc(&mut server, "eth_chainId", "0x539").await;

        let client = EvmRootPublisher::connect(&server.url(), contract_address(), None, None).unwrap();
        assert!(client.whitelist_only().await.unwrap());
        assert!(client
            .is_whitelisted(contract_address(), &[H256::repeat_byte(1)])
            .await
            .unwrap());
        assert_eq!(client.chain_id().await.unwrap(), 1337);
    }

    #[tokio::test]
    async fn rpc_errors_surface_as_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": -32000, "message": "execution reverted" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let from = contract_address();
        let client =
            EvmRootPublisher::connect(&server.url(), contract_address(), None, Some(from)).unwrap();
        assert!(client.published_root().await.is_err());
        assert!(client.publish_root(H256::repeat_byte(7)).await.is_err());
    }

    #[tokio::test]
    async fn writes_require_a_sender() {
        let client =
            EvmRootPublisher::connect("http://127.0.0.1:1", contract_address(), None, None).unwrap();
        let err = client.publish_root(H256::zero()).await.unwrap_err();
        assert!(err.to_string().contains("EVM_PRIVATE_KEY"));
        let err = client.set_whitelist_only(false).await.unwrap_err();
        assert!(err.to_string().contains("EVM_FROM"));
    }

    #[test]
    fn rejects_bad_key_and_mismatched_sender() {
        let url = "http://127.0.0.1:1";
        assert!(EvmRootPublisher::connect(url, contract_address(), Some("0x1234"), None).is_err());
        assert!(EvmRootPublisher::connect("not a url", contract_address(), None, None).is_err());

        let key = format!("0x{}", "01".repeat(32));
        assert!(EvmRootPublisher::connect(url, contract_address(), Some(&key), None).is_ok());
        assert!(
            EvmRootPublisher::connect(url, contract_address(), Some(&key), Some(contract_address()))
                .is_err()
        );
    }
}
