// Wire types and service glue for the `thalamus_grpc` package.
//
// Maintained by hand in the prost/tonic generated style so that builds do
// not depend on protoc; the authoritative schema is proto/thalamus.proto.

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Empty {}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringMessage {
    #[prost(string, tag = "1")]
    pub value: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringListMessage {
    #[prost(string, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeSelector {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub r#type: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObservableChange {
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    /// JSON-encoded value.
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
    #[prost(enumeration = "observable_change::Action", tag = "3")]
    pub action: i32,
}
/// Nested message and enum types in `ObservableChange`.
pub mod observable_change {
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration
    )]
    #[repr(i32)]
    pub enum Action {
        Set = 0,
        Delete = 1,
    }
    impl Action {
        /// String value of the enum field names used in the ProtoBuf definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Action::Set => "SET",
                Action::Delete => "DELETE",
            }
        }
        /// Creates an enum from field names used in the ProtoBuf definition.
        pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
            match value {
                "SET" => Some(Self::Set),
                "DELETE" => Some(Self::Delete),
                _ => None,
            }
        }
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ObservableTransaction {
    #[prost(message, repeated, tag = "1")]
    pub changes: ::prost::alloc::vec::Vec<ObservableChange>,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(uint64, tag = "3")]
    pub acknowledged: u64,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Span {
    #[prost(uint64, tag = "1")]
    pub begin: u64,
    #[prost(uint64, tag = "2")]
    pub end: u64,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalogRequest {
    #[prost(message, optional, tag = "1")]
    pub node: ::core::option::Option<NodeSelector>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalogResponse {
    #[prost(double, repeated, tag = "1")]
    pub data: ::prost::alloc::vec::Vec<f64>,
    #[prost(message, repeated, tag = "2")]
    pub spans: ::prost::alloc::vec::Vec<Span>,
    /// Nanoseconds per channel.
    #[prost(uint64, repeated, tag = "3")]
    pub sample_intervals: ::prost::alloc::vec::Vec<u64>,
    #[prost(int32, repeated, tag = "4")]
    pub int_data: ::prost::alloc::vec::Vec<i32>,
    #[prost(bool, tag = "5")]
    pub is_int_data: bool,
    #[prost(uint64, tag = "6")]
    pub time: u64,
    #[prost(uint64, tag = "7")]
    pub remote_time: u64,
    #[prost(bool, tag = "8")]
    pub channels_changed: bool,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Segment {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(uint32, tag = "2")]
    pub frame: u32,
    #[prost(uint32, tag = "3")]
    pub time: u32,
    #[prost(uint32, tag = "4")]
    pub actor: u32,
    #[prost(float, tag = "5")]
    pub x: f32,
    #[prost(float, tag = "6")]
    pub y: f32,
    #[prost(float, tag = "7")]
    pub z: f32,
    #[prost(float, tag = "8")]
    pub q0: f32,
    #[prost(float, tag = "9")]
    pub q1: f32,
    #[prost(float, tag = "10")]
    pub q2: f32,
    #[prost(float, tag = "11")]
    pub q3: f32,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct XsensResponse {
    #[prost(message, repeated, tag = "1")]
    pub segments: ::prost::alloc::vec::Vec<Segment>,
    #[prost(string, tag = "2")]
    pub pose_name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub time: u64,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImageRequest {
    #[prost(message, optional, tag = "1")]
    pub node: ::core::option::Option<NodeSelector>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Image {
    #[prost(uint32, tag = "1")]
    pub width: u32,
    #[prost(uint32, tag = "2")]
    pub height: u32,
    #[prost(enumeration = "image::Format", tag = "3")]
    pub format: i32,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub data: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint64, tag = "5")]
    pub frame_interval: u64,
    #[prost(uint64, tag = "6")]
    pub time: u64,
}
/// Nested message and enum types in `Image`.
pub mod image {
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration
    )]
    #[repr(i32)]
    pub enum Format {
        Gray = 0,
        Rgb = 1,
        Yuyv422 = 2,
        Yuv420p = 3,
        Yuvj420p = 4,
    }
    impl Format {
        /// String value of the enum field names used in the ProtoBuf definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Format::Gray => "GRAY",
                Format::Rgb => "RGB",
                Format::Yuyv422 => "YUYV422",
                Format::Yuv420p => "YUV420P",
                Format::Yuvj420p => "YUVJ420P",
            }
        }
        /// Creates an enum from field names used in the ProtoBuf definition.
        pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
            match value {
                "GRAY" => Some(Self::Gray),
                "RGB" => Some(Self::Rgb),
                "YUYV422" => Some(Self::Yuyv422),
                "YUV420P" => Some(Self::Yuv420p),
                "YUVJ420P" => Some(Self::Yuvj420p),
                _ => None,
            }
        }
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Text {
    #[prost(string, tag = "1")]
    pub text: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub time: u64,
    #[prost(uint64, tag = "3")]
    pub remote_time: u64,
    #[prost(string, tag = "4")]
    pub node: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub payload: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub time: u64,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Compressed {
    #[prost(enumeration = "compressed::Type", tag = "1")]
    pub r#type: i32,
    #[prost(int32, tag = "2")]
    pub stream: i32,
    /// Uncompressed size of the wrapped serialization.
    #[prost(uint64, tag = "3")]
    pub size: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}
/// Nested message and enum types in `Compressed`.
pub mod compressed {
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration
    )]
    #[repr(i32)]
    pub enum Type {
        None = 0,
        Analog = 1,
    }
    impl Type {
        /// String value of the enum field names used in the ProtoBuf definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Type::None => "NONE",
                Type::Analog => "ANALOG",
            }
        }
        /// Creates an enum from field names used in the ProtoBuf definition.
        pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
            match value {
                "NONE" => Some(Self::None),
                "ANALOG" => Some(Self::Analog),
                _ => None,
            }
        }
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageRecord {
    #[prost(uint64, tag = "6")]
    pub time: u64,
    #[prost(string, tag = "8")]
    pub node: ::prost::alloc::string::String,
    #[prost(oneof = "storage_record::Body", tags = "1, 2, 3, 4, 5, 7")]
    pub body: ::core::option::Option<storage_record::Body>,
}
/// Nested message and enum types in `StorageRecord`.
pub mod storage_record {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        Analog(super::AnalogResponse),
        #[prost(message, tag = "2")]
        Xsens(super::XsensResponse),
        #[prost(message, tag = "3")]
        Event(super::Event),
        #[prost(message, tag = "4")]
        Image(super::Image),
        #[prost(message, tag = "5")]
        Text(super::Text),
        #[prost(message, tag = "7")]
        Compressed(super::Compressed),
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ping {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pong {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InjectAnalogRequest {
    #[prost(string, tag = "1")]
    pub node: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub signal: ::core::option::Option<AnalogResponse>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeRequest {
    #[prost(string, tag = "1")]
    pub node: ::prost::alloc::string::String,
    /// JSON-encoded request body.
    #[prost(string, tag = "2")]
    pub json: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeResponse {
    #[prost(string, tag = "1")]
    pub json: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoteNodeMessage {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "remote_node_message::Content", tags = "2, 3")]
    pub content: ::core::option::Option<remote_node_message::Content>,
}
/// Nested message and enum types in `RemoteNodeMessage`.
pub mod remote_node_message {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Request {
        #[prost(string, tag = "1")]
        pub node: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub json: ::prost::alloc::string::String,
    }
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Response {
        #[prost(string, tag = "1")]
        pub json: ::prost::alloc::string::String,
    }
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        #[prost(message, tag = "2")]
        Request(Request),
        #[prost(message, tag = "3")]
        Response(Response),
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StimDeclaration {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// JSON-encoded program.
    #[prost(string, tag = "2")]
    pub data: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StimRequest {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, optional, tag = "2")]
    pub node: ::core::option::Option<NodeSelector>,
    #[prost(oneof = "stim_request::Op", tags = "3, 4, 5")]
    pub op: ::core::option::Option<stim_request::Op>,
}
/// Nested message and enum types in `StimRequest`.
pub mod stim_request {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(message, tag = "3")]
        Declare(super::StimDeclaration),
        #[prost(string, tag = "4")]
        Retrieve(::prost::alloc::string::String),
        #[prost(string, tag = "5")]
        Trigger(::prost::alloc::string::String),
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StimResponse {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub error: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub declaration: ::core::option::Option<StimDeclaration>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphRequest {}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeInfo {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub r#type: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub modalities: u32,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphResponse {
    #[prost(message, repeated, tag = "1")]
    pub nodes: ::prost::alloc::vec::Vec<NodeInfo>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModalitiesMessage {
    #[prost(uint32, tag = "1")]
    pub modalities: u32,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReplayRequest {
    #[prost(string, tag = "1")]
    pub filename: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub nodes: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Notification {
    #[prost(string, tag = "1")]
    pub title: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub time: u64,
}

/// Generated server implementations.
pub mod thalamus_server {
    #![allow(
        unused_variables,
        dead_code,
        missing_docs,
        clippy::wildcard_imports,
        clippy::let_unit_value
    )]
    use tonic::codegen::*;
    /// Generated trait containing gRPC methods that should be implemented for use with ThalamusServer.
    #[async_trait]
    pub trait Thalamus: Send + Sync + 'static {
        async fn get_type_name(
            &self,
            request: tonic::Request<super::StringMessage>,
        ) -> std::result::Result<tonic::Response<super::StringMessage>, tonic::Status>;
        async fn get_modalities(
            &self,
            request: tonic::Request<super::NodeSelector>,
        ) -> std::result::Result<tonic::Response<super::ModalitiesMessage>, tonic::Status>;
        async fn get_recommended_channels(
            &self,
            request: tonic::Request<super::NodeSelector>,
        ) -> std::result::Result<tonic::Response<super::StringListMessage>, tonic::Status>;
        async fn node_request(
            &self,
            request: tonic::Request<super::NodeRequest>,
        ) -> std::result::Result<tonic::Response<super::NodeResponse>, tonic::Status>;
        async fn replay(
            &self,
            request: tonic::Request<super::ReplayRequest>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status>;
        async fn observable_bridge_write(
            &self,
            request: tonic::Request<super::ObservableTransaction>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status>;
        /// Server streaming response type for the graph method.
        type GraphStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::GraphResponse, tonic::Status>,
            >
            + Send
            + 'static;
        async fn graph(
            &self,
            request: tonic::Request<super::GraphRequest>,
        ) -> std::result::Result<tonic::Response<Self::GraphStream>, tonic::Status>;
        /// Server streaming response type for the analog method.
        type AnalogStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::AnalogResponse, tonic::Status>,
            >
            + Send
            + 'static;
        async fn analog(
            &self,
            request: tonic::Request<super::AnalogRequest>,
        ) -> std::result::Result<tonic::Response<Self::AnalogStream>, tonic::Status>;
        /// Server streaming response type for the channel_info method.
        type ChannelInfoStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::AnalogResponse, tonic::Status>,
            >
            + Send
            + 'static;
        async fn channel_info(
            &self,
            request: tonic::Request<super::AnalogRequest>,
        ) -> std::result::Result<tonic::Response<Self::ChannelInfoStream>, tonic::Status>;
        /// Server streaming response type for the xsens method.
        type XsensStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::XsensResponse, tonic::Status>,
            >
            + Send
            + 'static;
        async fn xsens(
            &self,
            request: tonic::Request<super::NodeSelector>,
        ) -> std::result::Result<tonic::Response<Self::XsensStream>, tonic::Status>;
        /// Server streaming response type for the image method.
        type ImageStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::Image, tonic::Status>,
            >
            + Send
            + 'static;
        async fn image(
            &self,
            request: tonic::Request<super::ImageRequest>,
        ) -> std::result::Result<tonic::Response<Self::ImageStream>, tonic::Status>;
        /// Server streaming response type for the logout method.
        type LogoutStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::Text, tonic::Status>,
            >
            + Send
            + 'static;
        async fn logout(
            &self,
            request: tonic::Request<super::Empty>,
        ) -> std::result::Result<tonic::Response<Self::LogoutStream>, tonic::Status>;
        /// Server streaming response type for the notification method.
        type NotificationStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::Notification, tonic::Status>,
            >
            + Send
            + 'static;
        async fn notification(
            &self,
            request: tonic::Request<super::Empty>,
        ) -> std::result::Result<tonic::Response<Self::NotificationStream>, tonic::Status>;
        async fn events(
            &self,
            request: tonic::Request<tonic::Streaming<super::Event>>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status>;
        async fn log(
            &self,
            request: tonic::Request<tonic::Streaming<super::Text>>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status>;
        async fn inject_analog(
            &self,
            request: tonic::Request<tonic::Streaming<super::InjectAnalogRequest>>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status>;
        /// Server streaming response type for the observable_bridge_v2 method.
        type ObservableBridgeV2Stream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::ObservableTransaction, tonic::Status>,
            >
            + Send
            + 'static;
        async fn observable_bridge_v2(
            &self,
            request: tonic::Request<tonic::Streaming<super::ObservableTransaction>>,
        ) -> std::result::Result<
            tonic::Response<Self::ObservableBridgeV2Stream>,
            tonic::Status,
        >;
        /// Server streaming response type for the ping method.
        type PingStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::Pong, tonic::Status>,
            >
            + Send
            + 'static;
        async fn ping(
            &self,
            request: tonic::Request<tonic::Streaming<super::Ping>>,
        ) -> std::result::Result<tonic::Response<Self::PingStream>, tonic::Status>;
        /// Server streaming response type for the remote_node method.
        type RemoteNodeStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::RemoteNodeMessage, tonic::Status>,
            >
            + Send
            + 'static;
        async fn remote_node(
            &self,
            request: tonic::Request<tonic::Streaming<super::RemoteNodeMessage>>,
        ) -> std::result::Result<tonic::Response<Self::RemoteNodeStream>, tonic::Status>;
        /// Server streaming response type for the stim method.
        type StimStream: tonic::codegen::tokio_stream::Stream<
                Item = std::result::Result<super::StimResponse, tonic::Status>,
            >
            + Send
            + 'static;
        async fn stim(
            &self,
            request: tonic::Request<tonic::Streaming<super::StimRequest>>,
        ) -> std::result::Result<tonic::Response<Self::StimStream>, tonic::Status>;
    }
    #[derive(Debug)]
    pub struct ThalamusServer<T: Thalamus> {
        inner: _Inner<T>,
        accept_compression_encodings: EnabledCompressionEncodings,
        send_compression_encodings: EnabledCompressionEncodings,
        max_decoding_message_size: Option<usize>,
        max_encoding_message_size: Option<usize>,
    }
    struct _Inner<T>(Arc<T>);
    impl<T: Thalamus> ThalamusServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }
        pub fn from_arc(inner: Arc<T>) -> Self {
            let inner = _Inner(inner);
            Self {
                inner,
                accept_compression_encodings: Default::default(),
                send_compression_encodings: Default::default(),
                max_decoding_message_size: None,
                max_encoding_message_size: None,
            }
        }
        /// Enable decompressing requests with the given encoding.
        #[must_use]
        pub fn accept_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.accept_compression_encodings.enable(encoding);
            self
        }
        /// Compress responses with the given encoding, if the client supports it.
        #[must_use]
        pub fn send_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.send_compression_encodings.enable(encoding);
            self
        }
        /// Limits the maximum size of a decoded message.
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.max_decoding_message_size = Some(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.max_encoding_message_size = Some(limit);
            self
        }
    }
    impl<T, B> tonic::codegen::Service<http::Request<B>> for ThalamusServer<T>
    where
        T: Thalamus,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(
            &mut self,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/thalamus_grpc.Thalamus/get_type_name" => {
                    #[allow(non_camel_case_types)]
                    struct get_type_nameSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::UnaryService<super::StringMessage>
                    for get_type_nameSvc<T> {
                        type Response = super::StringMessage;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::StringMessage>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::get_type_name(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = get_type_nameSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/get_modalities" => {
                    #[allow(non_camel_case_types)]
                    struct get_modalitiesSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::UnaryService<super::NodeSelector>
                    for get_modalitiesSvc<T> {
                        type Response = super::ModalitiesMessage;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::NodeSelector>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::get_modalities(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = get_modalitiesSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/get_recommended_channels" => {
                    #[allow(non_camel_case_types)]
                    struct get_recommended_channelsSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::UnaryService<super::NodeSelector>
                    for get_recommended_channelsSvc<T> {
                        type Response = super::StringListMessage;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::NodeSelector>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::get_recommended_channels(&inner, request)
                                    .await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = get_recommended_channelsSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/node_request" => {
                    #[allow(non_camel_case_types)]
                    struct node_requestSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::UnaryService<super::NodeRequest>
                    for node_requestSvc<T> {
                        type Response = super::NodeResponse;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::NodeRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::node_request(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = node_requestSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/replay" => {
                    #[allow(non_camel_case_types)]
                    struct replaySvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::UnaryService<super::ReplayRequest>
                    for replaySvc<T> {
                        type Response = super::Empty;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ReplayRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::replay(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = replaySvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/observable_bridge_write" => {
                    #[allow(non_camel_case_types)]
                    struct observable_bridge_writeSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::UnaryService<super::ObservableTransaction>
                    for observable_bridge_writeSvc<T> {
                        type Response = super::Empty;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ObservableTransaction>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::observable_bridge_write(&inner, request)
                                    .await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = observable_bridge_writeSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/graph" => {
                    #[allow(non_camel_case_types)]
                    struct graphSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::ServerStreamingService<super::GraphRequest>
                    for graphSvc<T> {
                        type Response = super::GraphResponse;
                        type ResponseStream = T::GraphStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::GraphRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::graph(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = graphSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/analog" => {
                    #[allow(non_camel_case_types)]
                    struct analogSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::ServerStreamingService<super::AnalogRequest>
                    for analogSvc<T> {
                        type Response = super::AnalogResponse;
                        type ResponseStream = T::AnalogStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::AnalogRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::analog(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = analogSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/channel_info" => {
                    #[allow(non_camel_case_types)]
                    struct channel_infoSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::ServerStreamingService<super::AnalogRequest>
                    for channel_infoSvc<T> {
                        type Response = super::AnalogResponse;
                        type ResponseStream = T::ChannelInfoStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::AnalogRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::channel_info(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = channel_infoSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/xsens" => {
                    #[allow(non_camel_case_types)]
                    struct xsensSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::ServerStreamingService<super::NodeSelector>
                    for xsensSvc<T> {
                        type Response = super::XsensResponse;
                        type ResponseStream = T::XsensStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::NodeSelector>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::xsens(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = xsensSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/image" => {
                    #[allow(non_camel_case_types)]
                    struct imageSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::ServerStreamingService<super::ImageRequest>
                    for imageSvc<T> {
                        type Response = super::Image;
                        type ResponseStream = T::ImageStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ImageRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::image(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = imageSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/logout" => {
                    #[allow(non_camel_case_types)]
                    struct logoutSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::ServerStreamingService<super::Empty>
                    for logoutSvc<T> {
                        type Response = super::Text;
                        type ResponseStream = T::LogoutStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::Empty>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::logout(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = logoutSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/notification" => {
                    #[allow(non_camel_case_types)]
                    struct notificationSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::ServerStreamingService<super::Empty>
                    for notificationSvc<T> {
                        type Response = super::Notification;
                        type ResponseStream = T::NotificationStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::Empty>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::notification(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = notificationSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.server_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/events" => {
                    #[allow(non_camel_case_types)]
                    struct eventsSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::ClientStreamingService<super::Event>
                    for eventsSvc<T> {
                        type Response = super::Empty;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<tonic::Streaming<super::Event>>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::events(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = eventsSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.client_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/log" => {
                    #[allow(non_camel_case_types)]
                    struct logSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::ClientStreamingService<super::Text>
                    for logSvc<T> {
                        type Response = super::Empty;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<tonic::Streaming<super::Text>>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::log(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = logSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.client_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/inject_analog" => {
                    #[allow(non_camel_case_types)]
                    struct inject_analogSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::ClientStreamingService<super::InjectAnalogRequest>
                    for inject_analogSvc<T> {
                        type Response = super::Empty;
                        type Future = BoxFuture<
                            tonic::Response<Self::Response>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<
                                tonic::Streaming<super::InjectAnalogRequest>,
                            >,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::inject_analog(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = inject_analogSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.client_streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/observable_bridge_v2" => {
                    #[allow(non_camel_case_types)]
                    struct observable_bridge_v2Svc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::StreamingService<super::ObservableTransaction>
                    for observable_bridge_v2Svc<T> {
                        type Response = super::ObservableTransaction;
                        type ResponseStream = T::ObservableBridgeV2Stream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<
                                tonic::Streaming<super::ObservableTransaction>,
                            >,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::observable_bridge_v2(&inner, request)
                                    .await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = observable_bridge_v2Svc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/ping" => {
                    #[allow(non_camel_case_types)]
                    struct pingSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::StreamingService<super::Ping>
                    for pingSvc<T> {
                        type Response = super::Pong;
                        type ResponseStream = T::PingStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<tonic::Streaming<super::Ping>>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::ping(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = pingSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/remote_node" => {
                    #[allow(non_camel_case_types)]
                    struct remote_nodeSvc<T: Thalamus>(pub Arc<T>);
                    impl<
                        T: Thalamus,
                    > tonic::server::StreamingService<super::RemoteNodeMessage>
                    for remote_nodeSvc<T> {
                        type Response = super::RemoteNodeMessage;
                        type ResponseStream = T::RemoteNodeStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<
                                tonic::Streaming<super::RemoteNodeMessage>,
                            >,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::remote_node(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = remote_nodeSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/thalamus_grpc.Thalamus/stim" => {
                    #[allow(non_camel_case_types)]
                    struct stimSvc<T: Thalamus>(pub Arc<T>);
                    impl<T: Thalamus> tonic::server::StreamingService<super::StimRequest>
                    for stimSvc<T> {
                        type Response = super::StimResponse;
                        type ResponseStream = T::StimStream;
                        type Future = BoxFuture<
                            tonic::Response<Self::ResponseStream>,
                            tonic::Status,
                        >;
                        fn call(
                            &mut self,
                            request: tonic::Request<tonic::Streaming<super::StimRequest>>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move {
                                <T as Thalamus>::stim(&inner, request).await
                            };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let max_decoding_message_size = self.max_decoding_message_size;
                    let max_encoding_message_size = self.max_encoding_message_size;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = stimSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(
                                accept_compression_encodings,
                                send_compression_encodings,
                            )
                            .apply_max_message_size_config(
                                max_decoding_message_size,
                                max_encoding_message_size,
                            );
                        let res = grpc.streaming(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => {
                    Box::pin(async move {
                        Ok(
                            http::Response::builder()
                                .status(200)
                                .header("grpc-status", "12")
                                .header("content-type", "application/grpc")
                                .body(empty_body())
                                .unwrap(),
                        )
                    })
                }
            }
        }
    }
    impl<T: Thalamus> Clone for ThalamusServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self {
                inner,
                accept_compression_encodings: self.accept_compression_encodings,
                send_compression_encodings: self.send_compression_encodings,
                max_decoding_message_size: self.max_decoding_message_size,
                max_encoding_message_size: self.max_encoding_message_size,
            }
        }
    }
    impl<T: Thalamus> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(Arc::clone(&self.0))
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: Thalamus> tonic::server::NamedService for ThalamusServer<T> {
        const NAME: &'static str = "thalamus_grpc.Thalamus";
    }
}

/// Generated client implementations.
pub mod thalamus_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;
    #[derive(Debug, Clone)]
    pub struct ThalamusClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl ThalamusClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> ThalamusClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        /// Compress requests with the given encoding.
        #[must_use]
        pub fn send_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.inner = self.inner.send_compressed(encoding);
            self
        }
        /// Enable decompressing responses.
        #[must_use]
        pub fn accept_compressed(mut self, encoding: CompressionEncoding) -> Self {
            self.inner = self.inner.accept_compressed(encoding);
            self
        }
        /// Limits the maximum size of a decoded message.
        #[must_use]
        pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_decoding_message_size(limit);
            self
        }
        /// Limits the maximum size of an encoded message.
        #[must_use]
        pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
            self.inner = self.inner.max_encoding_message_size(limit);
            self
        }
        pub async fn get_type_name(
            &mut self,
            request: impl tonic::IntoRequest<super::StringMessage>,
        ) -> std::result::Result<tonic::Response<super::StringMessage>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/get_type_name",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "get_type_name"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn get_modalities(
            &mut self,
            request: impl tonic::IntoRequest<super::NodeSelector>,
        ) -> std::result::Result<
            tonic::Response<super::ModalitiesMessage>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/get_modalities",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "get_modalities"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn get_recommended_channels(
            &mut self,
            request: impl tonic::IntoRequest<super::NodeSelector>,
        ) -> std::result::Result<
            tonic::Response<super::StringListMessage>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/get_recommended_channels",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("thalamus_grpc.Thalamus", "get_recommended_channels"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn node_request(
            &mut self,
            request: impl tonic::IntoRequest<super::NodeRequest>,
        ) -> std::result::Result<tonic::Response<super::NodeResponse>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/node_request",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "node_request"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn replay(
            &mut self,
            request: impl tonic::IntoRequest<super::ReplayRequest>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/replay",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "replay"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn observable_bridge_write(
            &mut self,
            request: impl tonic::IntoRequest<super::ObservableTransaction>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/observable_bridge_write",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("thalamus_grpc.Thalamus", "observable_bridge_write"),
                );
            self.inner.unary(req, path, codec).await
        }
        pub async fn graph(
            &mut self,
            request: impl tonic::IntoRequest<super::GraphRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::GraphResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/graph",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "graph"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn analog(
            &mut self,
            request: impl tonic::IntoRequest<super::AnalogRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::AnalogResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/analog",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "analog"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn channel_info(
            &mut self,
            request: impl tonic::IntoRequest<super::AnalogRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::AnalogResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/channel_info",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "channel_info"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn xsens(
            &mut self,
            request: impl tonic::IntoRequest<super::NodeSelector>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::XsensResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/xsens",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "xsens"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn image(
            &mut self,
            request: impl tonic::IntoRequest<super::ImageRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::Image>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/image",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "image"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn logout(
            &mut self,
            request: impl tonic::IntoRequest<super::Empty>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::Text>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/logout",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "logout"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn notification(
            &mut self,
            request: impl tonic::IntoRequest<super::Empty>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::Notification>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/notification",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "notification"));
            self.inner.server_streaming(req, path, codec).await
        }
        pub async fn events(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::Event>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/events",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "events"));
            self.inner.client_streaming(req, path, codec).await
        }
        pub async fn log(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::Text>,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/log",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "log"));
            self.inner.client_streaming(req, path, codec).await
        }
        pub async fn inject_analog(
            &mut self,
            request: impl tonic::IntoStreamingRequest<
                Message = super::InjectAnalogRequest,
            >,
        ) -> std::result::Result<tonic::Response<super::Empty>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/inject_analog",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "inject_analog"));
            self.inner.client_streaming(req, path, codec).await
        }
        pub async fn observable_bridge_v2(
            &mut self,
            request: impl tonic::IntoStreamingRequest<
                Message = super::ObservableTransaction,
            >,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::ObservableTransaction>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/observable_bridge_v2",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("thalamus_grpc.Thalamus", "observable_bridge_v2"),
                );
            self.inner.streaming(req, path, codec).await
        }
        pub async fn ping(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::Ping>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::Pong>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/ping",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "ping"));
            self.inner.streaming(req, path, codec).await
        }
        pub async fn remote_node(
            &mut self,
            request: impl tonic::IntoStreamingRequest<
                Message = super::RemoteNodeMessage,
            >,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::RemoteNodeMessage>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/remote_node",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "remote_node"));
            self.inner.streaming(req, path, codec).await
        }
        pub async fn stim(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = super::StimRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::StimResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/thalamus_grpc.Thalamus/stim",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("thalamus_grpc.Thalamus", "stim"));
            self.inner.streaming(req, path, codec).await
        }
    }
}
