mod test_directed_messages;
mod test_reconnect_replaces_socket;
