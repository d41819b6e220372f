// This file is part of opgas.
//
// opgas is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// opgas is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with opgas.
// If not, see https://www.gnu.org/licenses/.

//! RPC request metrics for alloy transports.

use std::{
    task::{Context, Poll},
    time::Instant,
};

use alloy_json_rpc::{RequestPacket, ResponsePacket, ResponsePayload};
use alloy_transport::{TransportError, TransportFut};
use tower::{Layer, Service};

/// Alloy provider metric layer.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct AlloyMetricLayer;

impl<S> Layer<S> for AlloyMetricLayer {
    type Service = AlloyMetricMiddleware<S>;

    fn layer(&self, service: S) -> Self::Service {
        AlloyMetricMiddleware { service }
    }
}

/// Records the count and latency of every request by method and outcome.
#[derive(Debug, Clone)]
pub(crate) struct AlloyMetricMiddleware<S> {
    service: S,
}

impl<S> Service<RequestPacket> for AlloyMetricMiddleware<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Send
        + Sync
        + Clone
        + 'static,
    S::Future: Send + 'static,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let method = method_name(&request);
        let call_future = self.service.call(request);

        Box::pin(async move {
            let started = Instant::now();
            let response = call_future.await;
            let status = response_status(&response);

            metrics::counter!(
                "opgas_provider_rpc_requests",
                "method" => method.clone(),
                "status" => status
            )
            .increment(1);
            metrics::histogram!("opgas_provider_rpc_latency_ms", "method" => method)
                .record(started.elapsed().as_secs_f64() * 1_000.0);

            response
        })
    }
}

fn method_name(request: &RequestPacket) -> String {
    match request {
        RequestPacket::Single(request) => request.method().to_string(),
        RequestPacket::Batch(_) => "batch".to_string(),
    }
}

fn response_status(response: &Result<ResponsePacket, TransportError>) -> &'static str {
    match response {
        Ok(ResponsePacket::Single(resp)) => match &resp.payload {
            ResponsePayload::Success(_) => "success",
            // reverted eth_calls are expected during estimation
            ResponsePayload::Failure(err) if err.code == 3 => "reverted",
            ResponsePayload::Failure(_) => "rpc_error",
        },
        Ok(ResponsePacket::Batch(_)) => "success",
        Err(_) => "transport_error",
    }
}
