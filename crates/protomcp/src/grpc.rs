//! Unary gRPC calls with runtime-typed messages.
//!
//! Request and reply types come from descriptors, so the codec works on
//! `DynamicMessage` and decodes replies against the method's output type.

use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, MethodDescriptor};
use serde_json::{Map, Value};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::Status;
use tracing::Instrument;

use crate::convert::{decode_args, encode_proto};
use crate::registry::ToolError;

/// Codec for descriptor-typed requests and replies.
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    response: MessageDescriptor,
}

impl DynamicCodec {
    pub fn new(response: MessageDescriptor) -> Self {
        Self { response }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;
    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.response.clone())
    }
}

#[derive(Debug)]
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(dst)
            .map_err(|e| Status::internal(format!("failed to encode request: {}", e)))
    }
}

#[derive(Debug)]
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        DynamicMessage::decode(self.0.clone(), src)
            .map(Some)
            .map_err(|e| Status::internal(format!("failed to decode reply: {}", e)))
    }
}

/// One unary method bound to an upstream channel.
///
/// Each invocation performs exactly one call with no timeout and no retry.
/// Dropping the future cancels the call.
#[derive(Debug, Clone)]
pub struct UnaryMethod {
    method: MethodDescriptor,
    path: String,
    channel: Channel,
}

impl UnaryMethod {
    pub fn new(method: MethodDescriptor, channel: Channel) -> Self {
        let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
        Self {
            method,
            path,
            channel,
        }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.method
    }

    /// The HTTP/2 path of the method, `/package.Service/Method`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Send one request and wait for the reply.
    pub async fn call(&self, request: DynamicMessage) -> Result<DynamicMessage, Status> {
        let path = PathAndQuery::try_from(self.path.as_str())
            .map_err(|e| Status::internal(format!("invalid method path {}: {}", self.path, e)))?;

        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("upstream not ready: {}", e)))?;

        let codec = DynamicCodec::new(self.method.output());
        let response = grpc.unary(tonic::Request::new(request), path, codec).await?;
        Ok(response.into_inner())
    }

    /// Decode tool arguments, call the method, and encode the reply.
    pub async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let request = decode_args(Some(&arguments), &self.method.input())?;

        let span = tracing::info_span!(
            "grpc.unary",
            rpc.system = "grpc",
            rpc.service = %self.method.parent_service().full_name(),
            rpc.method = %self.method.name(),
            rpc.grpc.status_code = tracing::field::Empty,
        );

        let reply = match self.call(request).instrument(span.clone()).await {
            Ok(reply) => reply,
            Err(status) => {
                span.record("rpc.grpc.status_code", status.code() as i32);
                tracing::debug!(parent: &span, code = ?status.code(), "upstream call failed");
                return Err(status.into());
            }
        };

        Ok(Value::Object(encode_proto(Some(&reply))?))
    }
}
