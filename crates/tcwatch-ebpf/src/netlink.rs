//! clsact qdisc 的 netlink 原语
//!
//! Aya 没有暴露带替换语义的 qdisc 创建，也没有 qdisc 删除，
//! 因此这两个原语直接通过 NETLINK_ROUTE 套接字完成：
//! RTM_NEWQDISC（NLM_F_CREATE|NLM_F_REPLACE，幂等）与 RTM_DELQDISC。

use std::io;

use netlink_packet_core::{
    NetlinkHeader, NetlinkMessage, NetlinkPayload, NLM_F_ACK, NLM_F_CREATE, NLM_F_REPLACE,
    NLM_F_REQUEST,
};
use netlink_packet_route::tc::{TcAttribute, TcHandle, TcMessage};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_sys::{protocols::NETLINK_ROUTE, Socket, SocketAddr};

/// clsact qdisc 自身的句柄 ffff:0
const CLSACT_QDISC_HANDLE: TcHandle = TcHandle {
    major: 0xffff,
    minor: 0,
};

/// clsact 根 hook 的父标识（TC_H_CLSACT），区别于普通整形树
const CLSACT_PARENT: TcHandle = TcHandle {
    major: 0xffff,
    minor: 0xfff1,
};

/// qdisc 类型名
const CLSACT_KIND: &str = "clsact";

/// 应答缓冲区大小；qdisc 请求的 ACK 远小于该值
const RECV_BUF_LEN: usize = 4096;

/// 创建或替换接口上的 clsact qdisc
///
/// 同属性的 qdisc 已存在时被替换而不是报错。
pub(crate) fn replace_clsact(ifindex: u32) -> io::Result<()> {
    exchange(
        RouteNetlinkMessage::NewQueueDiscipline(clsact_message(ifindex)),
        NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE,
    )
}

/// 删除接口上的 clsact qdisc
pub(crate) fn delete_clsact(ifindex: u32) -> io::Result<()> {
    exchange(
        RouteNetlinkMessage::DelQueueDiscipline(clsact_message(ifindex)),
        NLM_F_REQUEST | NLM_F_ACK,
    )
}

/// 组装 clsact qdisc 消息体
fn clsact_message(ifindex: u32) -> TcMessage {
    let mut msg = TcMessage::default();
    msg.header.index = ifindex as i32;
    msg.header.handle = CLSACT_QDISC_HANDLE;
    msg.header.parent = CLSACT_PARENT;
    msg.attributes.push(TcAttribute::Kind(CLSACT_KIND.to_string()));
    msg
}

/// 发送单条请求并等待 ACK
fn exchange(payload: RouteNetlinkMessage, flags: u16) -> io::Result<()> {
    let mut header = NetlinkHeader::default();
    header.flags = flags;
    header.sequence_number = 1;

    let mut message = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
    message.finalize();

    let mut buf = vec![0u8; message.buffer_len()];
    message.serialize(&mut buf);

    let mut socket = Socket::new(NETLINK_ROUTE)?;
    socket.bind_auto()?;
    socket.connect(&SocketAddr::new(0, 0))?;
    socket.send(&buf, 0)?;

    let mut rbuf = vec![0u8; RECV_BUF_LEN];
    let n = socket.recv(&mut &mut rbuf[..], 0)?;

    let response = NetlinkMessage::<RouteNetlinkMessage>::deserialize(&rbuf[..n])
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    match response.payload {
        NetlinkPayload::Error(err) => match err.code {
            // code 为负 errno；None 即 ACK
            Some(code) => Err(io::Error::from_raw_os_error(code.get().wrapping_abs())),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(payload: RouteNetlinkMessage, flags: u16) -> NetlinkMessage<RouteNetlinkMessage> {
        let mut header = NetlinkHeader::default();
        header.flags = flags;
        header.sequence_number = 1;
        let mut message = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
        message.finalize();
        let mut buf = vec![0u8; message.buffer_len()];
        message.serialize(&mut buf);
        NetlinkMessage::<RouteNetlinkMessage>::deserialize(&buf).unwrap()
    }

    #[test]
    fn test_clsact_message_layout() {
        let msg = clsact_message(7);
        assert_eq!(msg.header.index, 7);
        assert_eq!(msg.header.handle, CLSACT_QDISC_HANDLE);
        assert_eq!(msg.header.parent, CLSACT_PARENT);
        assert!(msg
            .attributes
            .iter()
            .any(|attr| matches!(attr, TcAttribute::Kind(kind) if kind == CLSACT_KIND)));
    }

    #[test]
    fn test_replace_request_roundtrip() {
        let parsed = roundtrip(
            RouteNetlinkMessage::NewQueueDiscipline(clsact_message(3)),
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE,
        );

        // 替换语义必须携带 CREATE|REPLACE，不携带 EXCL
        assert_ne!(parsed.header.flags & NLM_F_REPLACE, 0);
        assert_ne!(parsed.header.flags & NLM_F_CREATE, 0);

        match parsed.payload {
            NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewQueueDiscipline(tc)) => {
                assert_eq!(tc.header.index, 3);
                assert_eq!(tc.header.parent, CLSACT_PARENT);
            }
            other => panic!("意外的消息负载: {:?}", other),
        }
    }

    #[test]
    fn test_delete_request_roundtrip() {
        let parsed = roundtrip(
            RouteNetlinkMessage::DelQueueDiscipline(clsact_message(9)),
            NLM_F_REQUEST | NLM_F_ACK,
        );

        match parsed.payload {
            NetlinkPayload::InnerMessage(RouteNetlinkMessage::DelQueueDiscipline(tc)) => {
                assert_eq!(tc.header.index, 9);
                assert_eq!(tc.header.handle, CLSACT_QDISC_HANDLE);
            }
            other => panic!("意外的消息负载: {:?}", other),
        }
    }
}
