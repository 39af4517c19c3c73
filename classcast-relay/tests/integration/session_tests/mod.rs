mod test_sessions_negotiate_over_relay;
