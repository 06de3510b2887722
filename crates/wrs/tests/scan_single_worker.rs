//! With a single worker, every partition waits on predecessors executed by the same thread.

use wrs::prelude::*;

fn test_client() -> ComputeClient {
    ComputeClient::new(ClientOptions::new(1))
}

wrs_scan::testgen_scan!();
