pub mod verifier;

pub use verifier::{
    compute_root_from_proof, verify_address_proof, verify_membership_proof, verify_proof_record,
};
